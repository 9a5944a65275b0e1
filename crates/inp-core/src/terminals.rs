//! Terminal values
//!
//! Leaf token types of the INP dialect. Each one owns a grammar fragment, a
//! parser from its token text and a canonical serializer. Parsing first checks
//! the token against the anchored fragment, then decodes the token's structure.
//! Values built in code take the same route: see [`crate::record::Input`].

use std::fmt;
use std::str::FromStr;

use inp_types::{ErrorDomain, ErrorRecord, Granularity};
use nom::{
    bytes::complete::take_while_m_n,
    character::complete::{alpha1, anychar, char, digit0, digit1, one_of},
    combinator::{all_consuming, map_opt, opt, recognize},
    multi::separated_list1,
    sequence::{pair, preceded, terminated},
    IResult,
};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::grammar::GrammarFragment;

/// A leaf value type with its own grammar.
pub trait Terminal: Sized + Clone + PartialEq + fmt::Debug {
    /// Human-readable name used in error messages
    const NAME: &'static str;

    fn fragment() -> GrammarFragment;

    fn parse(text: &str) -> Result<Self, ErrorRecord>;

    fn serialize(&self) -> String;
}

// ============================================================================
// Fragment bodies and matchers
// ============================================================================

const INTEGER_BODY: &str = r"[-+]?[0-9]+";
const REAL_BODY: &str = r"[-+]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][-+]?[0-9]+)?";
const TEXT_BODY: &str = r"\S+";
const JUMP_BODY: &str = r"[0-9]*j";
const DISTRIBUTION_BODY: &str = r"d[0-9]+";
const ZAID_BODY: &str = r"[0-9]{1,6}(?:\.[0-9]{2}[a-z])?";

fn matcher(body: &str) -> Regex {
    Regex::new(&format!("(?i)^(?:{})$", body)).unwrap()
}

static INTEGER_RE: Lazy<Regex> = Lazy::new(|| matcher(INTEGER_BODY));
static REAL_RE: Lazy<Regex> = Lazy::new(|| matcher(REAL_BODY));
static TEXT_RE: Lazy<Regex> = Lazy::new(|| matcher(TEXT_BODY));
static JUMP_RE: Lazy<Regex> = Lazy::new(|| matcher(JUMP_BODY));
static DISTRIBUTION_RE: Lazy<Regex> = Lazy::new(|| matcher(DISTRIBUTION_BODY));
static ZAID_RE: Lazy<Regex> = Lazy::new(|| matcher(ZAID_BODY));
static DESIGNATOR_RE: Lazy<Regex> = Lazy::new(|| matcher(Designator::fragment().body()));

fn syntax_error(expected: &str, text: &str) -> ErrorRecord {
    ErrorRecord::syntax(
        ErrorDomain::Types,
        Granularity::Entry,
        format!("expected {}, found '{}'", expected, first_line(text)),
        text,
    )
}

fn value_error(message: impl Into<String>, text: &str) -> ErrorRecord {
    ErrorRecord::semantics(ErrorDomain::Types, Granularity::Entry, message, text)
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("")
}

fn check_token(re: &Regex, expected: &str, text: &str) -> Result<(), ErrorRecord> {
    if re.is_match(text) {
        Ok(())
    } else {
        Err(syntax_error(expected, text))
    }
}

/// Shortest decimal that reads back as the same `f64`.
///
/// Very large and very small magnitudes use exponent notation to stay short.
pub fn format_real(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-5..1e16).contains(&magnitude) {
        format!("{:e}", value)
    } else {
        format!("{}", value)
    }
}

// ============================================================================
// Integer
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Integer(pub i64);

impl Integer {
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl Terminal for Integer {
    const NAME: &'static str = "integer";

    fn fragment() -> GrammarFragment {
        GrammarFragment::new(INTEGER_BODY)
    }

    fn parse(text: &str) -> Result<Self, ErrorRecord> {
        check_token(&INTEGER_RE, Self::NAME, text)?;
        text.parse::<i64>()
            .map(Integer)
            .map_err(|_| value_error(format!("integer '{}' is out of range", text), text))
    }

    fn serialize(&self) -> String {
        self.0.to_string()
    }
}

// ============================================================================
// Real
// ============================================================================

/// A finite floating point value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Real(f64);

impl Real {
    pub fn new(value: f64) -> Result<Self, ErrorRecord> {
        if value.is_finite() {
            Ok(Real(value))
        } else {
            Err(value_error(
                format!("real value {} is not finite", value),
                &value.to_string(),
            ))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl Terminal for Real {
    const NAME: &'static str = "real";

    fn fragment() -> GrammarFragment {
        GrammarFragment::new(REAL_BODY)
    }

    fn parse(text: &str) -> Result<Self, ErrorRecord> {
        check_token(&REAL_RE, Self::NAME, text)?;
        let value = text
            .parse::<f64>()
            .map_err(|_| syntax_error(Self::NAME, text))?;
        if value.is_finite() {
            Ok(Real(value))
        } else {
            Err(value_error(format!("real '{}' overflows", text), text))
        }
    }

    fn serialize(&self) -> String {
        format_real(self.0)
    }
}

// ============================================================================
// Text
// ============================================================================

/// A single whitespace-free token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Text(String);

impl Text {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Terminal for Text {
    const NAME: &'static str = "string";

    fn fragment() -> GrammarFragment {
        GrammarFragment::new(TEXT_BODY)
    }

    fn parse(text: &str) -> Result<Self, ErrorRecord> {
        check_token(&TEXT_RE, Self::NAME, text)?;
        Ok(Text(text.to_string()))
    }

    fn serialize(&self) -> String {
        self.0.clone()
    }
}

// ============================================================================
// Particle designator
// ============================================================================

/// Particle types that may follow a `:` designator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Particle {
    Neutron,
    Photon,
    Electron,
    Positron,
    Proton,
    Deuteron,
    Triton,
    Helion,
    Alpha,
    HeavyIon,
    NegativeMuon,
    PositiveMuon,
    PositivePion,
    NegativePion,
    PositiveKaon,
    AntiNeutron,
    AntiProton,
}

impl Particle {
    pub const ALL: [Particle; 17] = [
        Particle::Neutron,
        Particle::Photon,
        Particle::Electron,
        Particle::Positron,
        Particle::Proton,
        Particle::Deuteron,
        Particle::Triton,
        Particle::Helion,
        Particle::Alpha,
        Particle::HeavyIon,
        Particle::NegativeMuon,
        Particle::PositiveMuon,
        Particle::PositivePion,
        Particle::NegativePion,
        Particle::PositiveKaon,
        Particle::AntiNeutron,
        Particle::AntiProton,
    ];

    pub fn symbol(&self) -> char {
        match self {
            Particle::Neutron => 'n',
            Particle::Photon => 'p',
            Particle::Electron => 'e',
            Particle::Positron => 'f',
            Particle::Proton => 'h',
            Particle::Deuteron => 'd',
            Particle::Triton => 't',
            Particle::Helion => 's',
            Particle::Alpha => 'a',
            Particle::HeavyIon => '#',
            Particle::NegativeMuon => '|',
            Particle::PositiveMuon => '!',
            Particle::PositivePion => '/',
            Particle::NegativePion => '*',
            Particle::PositiveKaon => 'k',
            Particle::AntiNeutron => 'q',
            Particle::AntiProton => 'g',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Particle> {
        let symbol = symbol.to_ascii_lowercase();
        Particle::ALL.into_iter().find(|p| p.symbol() == symbol)
    }
}

impl fmt::Display for Particle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Comma-separated particle list, e.g. `n` or `n,p`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Designator(Vec<Particle>);

impl Designator {
    pub fn new(particles: Vec<Particle>) -> Result<Self, ErrorRecord> {
        if particles.is_empty() {
            return Err(value_error("designator needs at least one particle", ""));
        }
        Ok(Designator(particles))
    }

    pub fn single(particle: Particle) -> Self {
        Designator(vec![particle])
    }

    pub fn particles(&self) -> &[Particle] {
        &self.0
    }

    pub fn contains(&self, particle: Particle) -> bool {
        self.0.contains(&particle)
    }
}

fn particle(input: &str) -> IResult<&str, Particle> {
    map_opt(anychar, Particle::from_symbol)(input)
}

impl Terminal for Designator {
    const NAME: &'static str = "particle designator";

    fn fragment() -> GrammarFragment {
        let symbol = GrammarFragment::alternation(
            Particle::ALL
                .iter()
                .map(|p| GrammarFragment::literal(&p.symbol().to_string())),
        );
        // Comma joined, no whitespace inside a designator.
        GrammarFragment::new(format!("{0}(?:,{0})*", symbol.body()))
    }

    fn parse(text: &str) -> Result<Self, ErrorRecord> {
        check_token(&DESIGNATOR_RE, Self::NAME, text)?;
        let (_, particles) = all_consuming(separated_list1(char(','), particle))(text)
            .map_err(|_: nom::Err<nom::error::Error<&str>>| syntax_error(Self::NAME, text))?;
        Ok(Designator(particles))
    }

    fn serialize(&self) -> String {
        self.0
            .iter()
            .map(|p| p.symbol().to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl FromStr for Designator {
    type Err = ErrorRecord;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Designator::parse(s)
    }
}

// ============================================================================
// Nuclide identifier (ZAID)
// ============================================================================

/// Highest atomic number accepted in a ZAID.
pub const MAX_ATOMIC_NUMBER: u32 = 118;

/// `ZZZAAA[.nnX]`: atomic number, mass number (0 for natural) and library.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Zaid {
    pub z: u32,
    pub a: u32,
    pub library: Option<String>,
}

impl Zaid {
    pub fn new(z: u32, a: u32, library: Option<&str>) -> Result<Self, ErrorRecord> {
        if a >= 1000 {
            return Err(value_error(
                format!("mass number {} exceeds 999", a),
                &a.to_string(),
            ));
        }
        if z == 0 || z > MAX_ATOMIC_NUMBER {
            return Err(value_error(
                format!("atomic number {} outside 1..={}", z, MAX_ATOMIC_NUMBER),
                &z.to_string(),
            ));
        }
        let text = match library {
            Some(lib) => format!("{}.{}", z * 1000 + a, lib),
            None => (z * 1000 + a).to_string(),
        };
        Zaid::parse(&text)
    }

    /// The packed `ZZZAAA` number.
    pub fn number(&self) -> u32 {
        self.z * 1000 + self.a
    }
}

fn zaid_parts(input: &str) -> IResult<&str, (&str, Option<&str>)> {
    pair(
        digit1,
        opt(preceded(
            char('.'),
            recognize(pair(
                take_while_m_n(2, 2, |c: char| c.is_ascii_digit()),
                alpha1,
            )),
        )),
    )(input)
}

impl Terminal for Zaid {
    const NAME: &'static str = "nuclide id";

    fn fragment() -> GrammarFragment {
        GrammarFragment::new(ZAID_BODY)
    }

    fn parse(text: &str) -> Result<Self, ErrorRecord> {
        check_token(&ZAID_RE, Self::NAME, text)?;
        let (_, (number, library)) = all_consuming(zaid_parts)(text)
            .map_err(|_: nom::Err<nom::error::Error<&str>>| syntax_error(Self::NAME, text))?;
        let number: u32 = number
            .parse()
            .map_err(|_| syntax_error(Self::NAME, text))?;
        let (z, a) = (number / 1000, number % 1000);
        if z == 0 || z > MAX_ATOMIC_NUMBER {
            return Err(value_error(
                format!("atomic number {} outside 1..={}", z, MAX_ATOMIC_NUMBER),
                text,
            ));
        }
        Ok(Zaid {
            z,
            a,
            library: library.map(|lib| lib.to_ascii_lowercase()),
        })
    }

    fn serialize(&self) -> String {
        match &self.library {
            Some(lib) => format!("{}.{}", self.number(), lib),
            None => self.number().to_string(),
        }
    }
}

impl FromStr for Zaid {
    type Err = ErrorRecord;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Zaid::parse(s)
    }
}

// ============================================================================
// Jump
// ============================================================================

/// `j` / `Nj`: skip N entries, leaving their defaults in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Jump(u32);

impl Jump {
    pub fn new(count: u32) -> Result<Self, ErrorRecord> {
        if count == 0 {
            return Err(value_error("jump count must be at least 1", "0j"));
        }
        Ok(Jump(count))
    }

    pub fn count(&self) -> u32 {
        self.0
    }
}

fn jump_count(input: &str) -> IResult<&str, &str> {
    terminated(digit0, one_of("jJ"))(input)
}

impl Terminal for Jump {
    const NAME: &'static str = "jump";

    fn fragment() -> GrammarFragment {
        GrammarFragment::new(JUMP_BODY)
    }

    fn parse(text: &str) -> Result<Self, ErrorRecord> {
        check_token(&JUMP_RE, Self::NAME, text)?;
        let (_, digits) = all_consuming(jump_count)(text)
            .map_err(|_: nom::Err<nom::error::Error<&str>>| syntax_error(Self::NAME, text))?;
        let count = if digits.is_empty() {
            1
        } else {
            digits
                .parse::<u32>()
                .map_err(|_| value_error(format!("jump '{}' is out of range", text), text))?
        };
        if count == 0 {
            return Err(value_error("jump count must be at least 1", text));
        }
        Ok(Jump(count))
    }

    fn serialize(&self) -> String {
        if self.0 == 1 {
            "j".to_string()
        } else {
            format!("{}j", self.0)
        }
    }
}

// ============================================================================
// Distribution reference
// ============================================================================

/// `dN`: reference to source distribution N.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DistributionRef(u32);

impl DistributionRef {
    pub fn new(number: u32) -> Result<Self, ErrorRecord> {
        DistributionRef::parse(&format!("d{}", number))
    }

    pub fn number(&self) -> u32 {
        self.0
    }
}

fn distribution_number(input: &str) -> IResult<&str, &str> {
    preceded(one_of("dD"), digit1)(input)
}

impl Terminal for DistributionRef {
    const NAME: &'static str = "distribution reference";

    fn fragment() -> GrammarFragment {
        GrammarFragment::new(DISTRIBUTION_BODY)
    }

    fn parse(text: &str) -> Result<Self, ErrorRecord> {
        check_token(&DISTRIBUTION_RE, Self::NAME, text)?;
        let (_, digits) = all_consuming(distribution_number)(text)
            .map_err(|_: nom::Err<nom::error::Error<&str>>| syntax_error(Self::NAME, text))?;
        match digits.parse::<u32>() {
            Ok(n) if n >= 1 => Ok(DistributionRef(n)),
            _ => Err(value_error(
                format!("distribution number in '{}' must be in 1..={}", text, u32::MAX),
                text,
            )),
        }
    }

    fn serialize(&self) -> String {
        format!("d{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer() {
        assert_eq!(Integer::parse("5").unwrap(), Integer(5));
        assert_eq!(Integer::parse("-12").unwrap(), Integer(-12));
        assert_eq!(Integer::parse("+7").unwrap().serialize(), "7");
        assert!(Integer::parse("5.0").unwrap_err().is_syntax());
        let overflow = Integer::parse("99999999999999999999").unwrap_err();
        assert!(overflow.is_semantics());
        assert_eq!(overflow.domain, ErrorDomain::Types);
    }

    #[test]
    fn test_real_forms() {
        assert_eq!(Real::parse("-0.6667").unwrap().value(), -0.6667);
        assert_eq!(Real::parse("1e5").unwrap().value(), 100000.0);
        assert_eq!(Real::parse(".5").unwrap().value(), 0.5);
        assert_eq!(Real::parse("5.").unwrap().value(), 5.0);
        assert_eq!(Real::parse("2E-3").unwrap().value(), 0.002);
        assert!(Real::parse("abc").unwrap_err().is_syntax());
        assert!(Real::parse("1e999").unwrap_err().is_semantics());
    }

    #[test]
    fn test_real_canonical_text() {
        assert_eq!(Real::parse("0").unwrap().serialize(), "0");
        assert_eq!(Real::parse("-0.6667").unwrap().serialize(), "-0.6667");
        assert_eq!(Real::parse("1.50").unwrap().serialize(), "1.5");
        assert_eq!(format_real(1e20), "1e20");
        assert_eq!(format_real(2.5e-7), "2.5e-7");
        for text in ["1e20", "2.5e-7", "123456.789", "-3"] {
            let v = Real::parse(text).unwrap();
            assert_eq!(Real::parse(&v.serialize()).unwrap(), v);
        }
    }

    #[test]
    fn test_real_new_rejects_nan() {
        assert!(Real::new(f64::NAN).is_err());
        assert!(Real::new(f64::INFINITY).is_err());
        assert_eq!(Real::new(1.25).unwrap().value(), 1.25);
    }

    #[test]
    fn test_text() {
        assert_eq!(Text::parse("file.dat").unwrap().as_str(), "file.dat");
        assert!(Text::parse("two words").is_err());
        assert!(Text::parse("").is_err());
    }

    #[test]
    fn test_designator() {
        let d = Designator::parse("n").unwrap();
        assert_eq!(d.particles(), &[Particle::Neutron]);
        let d = Designator::parse("N,P").unwrap();
        assert_eq!(d.particles(), &[Particle::Neutron, Particle::Photon]);
        assert_eq!(d.serialize(), "n,p");
        assert_eq!(Designator::parse("|").unwrap().serialize(), "|");
        assert!(Designator::parse("x").is_err());
        assert!(Designator::parse("n,").is_err());
    }

    #[test]
    fn test_zaid() {
        let h1 = Zaid::parse("1001").unwrap();
        assert_eq!((h1.z, h1.a, h1.library.as_deref()), (1, 1, None));
        let u235 = Zaid::parse("92235.80C").unwrap();
        assert_eq!((u235.z, u235.a), (92, 235));
        assert_eq!(u235.serialize(), "92235.80c");
        let natural = Zaid::parse("6000").unwrap();
        assert_eq!((natural.z, natural.a), (6, 0));
        assert!(Zaid::parse("999001").unwrap_err().is_semantics());
        assert!(Zaid::parse("1001.8c").unwrap_err().is_syntax());
        assert_eq!(Zaid::new(8, 16, None).unwrap().serialize(), "8016");
        assert!(Zaid::new(8, 1016, None).is_err());
    }

    #[test]
    fn test_jump() {
        assert_eq!(Jump::parse("j").unwrap().count(), 1);
        assert_eq!(Jump::parse("3J").unwrap().count(), 3);
        assert_eq!(Jump::parse("3j").unwrap().serialize(), "3j");
        assert_eq!(Jump::parse("1j").unwrap().serialize(), "j");
        assert!(Jump::parse("0j").unwrap_err().is_semantics());
        assert!(Jump::parse("jj").unwrap_err().is_syntax());
    }

    #[test]
    fn test_distribution() {
        assert_eq!(DistributionRef::parse("d5").unwrap().number(), 5);
        assert_eq!(DistributionRef::parse("D12").unwrap().serialize(), "d12");
        assert!(DistributionRef::parse("d0").unwrap_err().is_semantics());
        assert!(DistributionRef::parse("5").unwrap_err().is_syntax());
    }
}
