//! Bounded value types used by schema components
//!
//! - [`Count`]: a repetition bound (`minOccurs`/`maxOccurs`) that may be
//!   `unbounded`
//! - [`EnumFlags`]: a 16-bit flag set over a small symbolic enumeration
//! - [`AllEnumSet`]: an enumeration set that is absent, an explicit subset,
//!   or the special `#all` value (`block`, `final`, `blockDefault`, ...)

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Text of the unbounded count
pub const UNBOUNDED: &str = "unbounded";

/// Text of the all-values enumeration set
pub const ALL_TOKEN: &str = "#all";

/// Repetition bound
///
/// `Count::ZERO`, `Count::ONE` and `Count::UNBOUNDED` are the canonical
/// values; any other non-negative bound is `Count::Bounded(n)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Count {
    /// A finite bound
    Bounded(u32),
    /// No upper bound
    Unbounded,
}

impl Count {
    /// The count 0
    pub const ZERO: Count = Count::Bounded(0);
    /// The count 1
    pub const ONE: Count = Count::Bounded(1);
    /// The unbounded count
    pub const UNBOUNDED: Count = Count::Unbounded;

    /// Create a bounded count
    pub fn new(value: u32) -> Self {
        Count::Bounded(value)
    }

    /// Check if this count is unbounded
    pub fn is_unbounded(&self) -> bool {
        matches!(self, Count::Unbounded)
    }

    /// Check if this count is bounded and equal to `value`
    pub fn equals(&self, value: u32) -> bool {
        matches!(self, Count::Bounded(n) if *n == value)
    }

    /// Check if this count exceeds `value`; unbounded exceeds everything
    pub fn greater_than(&self, value: u32) -> bool {
        match self {
            Count::Bounded(n) => *n > value,
            Count::Unbounded => true,
        }
    }

    /// Get the bounded value
    ///
    /// Fails with [`Error::InvalidState`] on an unbounded count; use the
    /// predicates when the count may be unbounded.
    pub fn value(&self) -> Result<u32> {
        match self {
            Count::Bounded(n) => Ok(*n),
            Count::Unbounded => Err(Error::InvalidState(
                "unbounded count has no numeric value".to_string(),
            )),
        }
    }
}

impl FromStr for Count {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let text = s.trim();
        if text == UNBOUNDED {
            return Ok(Count::Unbounded);
        }
        if let Ok(n) = text.parse::<u32>() {
            return Ok(Count::Bounded(n));
        }
        // Any nonNegativeInteger is legal; bounds past u32 saturate
        let digits = text.strip_prefix('+').unwrap_or(text);
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            return Ok(Count::Bounded(u32::MAX));
        }
        Err(Error::Value(format!(
            "'{}' is not a non-negative integer or '{}'",
            s, UNBOUNDED
        )))
    }
}

impl fmt::Display for Count {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Count::Bounded(n) => write!(f, "{}", n),
            Count::Unbounded => write!(f, "{}", UNBOUNDED),
        }
    }
}

/// A closed enumeration with a textual symbol per value
pub trait EnumSymbol: Copy + Eq + fmt::Debug + 'static {
    /// Symbols in ordinal order
    const SYMBOLS: &'static [&'static str];

    /// Values in ordinal order
    const VALUES: &'static [Self];

    /// Position of this value in [`Self::SYMBOLS`]
    fn ordinal(self) -> usize;

    /// Value at an ordinal
    fn from_ordinal(ordinal: usize) -> Option<Self> {
        Self::VALUES.get(ordinal).copied()
    }

    /// Textual symbol of this value
    fn symbol(self) -> &'static str {
        Self::SYMBOLS[self.ordinal()]
    }

    /// Value for a textual symbol
    fn from_symbol(text: &str) -> Option<Self> {
        Self::SYMBOLS
            .iter()
            .position(|s| *s == text)
            .and_then(Self::from_ordinal)
    }
}

/// Convert text to an enumeration value, describing the allowed symbols on failure
pub fn parse_symbol<E: EnumSymbol>(text: &str) -> std::result::Result<E, String> {
    E::from_symbol(text.trim()).ok_or_else(|| {
        format!("'{}' is not one of: {}", text, E::SYMBOLS.join(", "))
    })
}

macro_rules! symbolic_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $symbol:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl EnumSymbol for $name {
            const SYMBOLS: &'static [&'static str] = &[$($symbol),+];
            const VALUES: &'static [Self] = &[$(Self::$variant),+];

            fn ordinal(self) -> usize {
                self as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.symbol())
            }
        }
    };
}

symbolic_enum! {
    /// Namespace qualification of a local element or attribute
    pub enum FormChoice {
        /// Local name is qualified with the target namespace
        Qualified => "qualified",
        /// Local name is in no namespace
        Unqualified => "unqualified",
    }
}

symbolic_enum! {
    /// `use` of a local attribute
    pub enum AttributeUse {
        /// May be absent
        Optional => "optional",
        /// Must be present
        Required => "required",
        /// Must be absent
        Prohibited => "prohibited",
    }
}

symbolic_enum! {
    /// `processContents` of a wildcard
    pub enum ProcessContents {
        /// Must validate
        Strict => "strict",
        /// Validate if a declaration is available
        Lax => "lax",
        /// No validation
        Skip => "skip",
    }
}

symbolic_enum! {
    /// `whiteSpace` facet values
    pub enum WhiteSpace {
        /// Keep as is
        Preserve => "preserve",
        /// Replace tabs and newlines with spaces
        Replace => "replace",
        /// Replace, then collapse runs of spaces
        Collapse => "collapse",
    }
}

symbolic_enum! {
    /// Element `block` and schema `blockDefault` values
    pub enum BlockValue {
        /// Block derivation by extension
        Extension => "extension",
        /// Block derivation by restriction
        Restriction => "restriction",
        /// Block substitution group members
        Substitution => "substitution",
    }
}

symbolic_enum! {
    /// Element `final`, complex type `block` and `final` values
    pub enum DerivationValue {
        /// Derivation by extension
        Extension => "extension",
        /// Derivation by restriction
        Restriction => "restriction",
    }
}

symbolic_enum! {
    /// Schema `finalDefault` values
    pub enum FinalValue {
        /// Derivation by extension
        Extension => "extension",
        /// Derivation by restriction
        Restriction => "restriction",
        /// Derivation by list
        List => "list",
        /// Derivation by union
        Union => "union",
    }
}

symbolic_enum! {
    /// Simple type `final` values
    pub enum SimpleFinalValue {
        /// Derivation by list
        List => "list",
        /// Derivation by union
        Union => "union",
        /// Derivation by restriction
        Restriction => "restriction",
    }
}

/// Parse an xs:boolean lexical value
pub fn parse_boolean(text: &str) -> Option<bool> {
    match text.trim() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// Fixed-width flag set over an enumeration of at most 16 values
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnumFlags<E: EnumSymbol> {
    bits: u16,
    _marker: PhantomData<E>,
}

impl<E: EnumSymbol> EnumFlags<E> {
    const ARITY_FITS: () = assert!(
        E::SYMBOLS.len() <= 16,
        "EnumFlags supports enumerations of at most 16 symbols"
    );

    /// Create an empty set
    pub fn empty() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::ARITY_FITS;
        Self {
            bits: 0,
            _marker: PhantomData,
        }
    }

    /// Create a set holding every value of the enumeration
    pub fn full() -> Self {
        let mut flags = Self::empty();
        flags.bits = ((1u32 << E::SYMBOLS.len()) - 1) as u16;
        flags
    }

    /// Add a value
    pub fn insert(&mut self, value: E) {
        self.bits |= 1 << value.ordinal();
    }

    /// Remove a value
    pub fn remove(&mut self, value: E) {
        self.bits &= !(1 << value.ordinal());
    }

    /// Check for a value
    pub fn contains(&self, value: E) -> bool {
        self.bits & (1 << value.ordinal()) != 0
    }

    /// Check if no value is set
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Number of values set
    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Values set, in ordinal order
    pub fn iter(&self) -> impl Iterator<Item = E> + '_ {
        E::VALUES.iter().copied().filter(move |v| self.contains(*v))
    }
}

impl<E: EnumSymbol> Default for EnumFlags<E> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<E: EnumSymbol> fmt::Debug for EnumFlags<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SetState<E: EnumSymbol> {
    Absent,
    Values(EnumFlags<E>),
    All,
}

/// Enumeration set with the special `#all` value
///
/// `#all` and explicit values never mix in one textual value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllEnumSet<E: EnumSymbol> {
    state: SetState<E>,
}

impl<E: EnumSymbol> AllEnumSet<E> {
    /// Create an absent set
    pub fn new() -> Self {
        Self {
            state: SetState::Absent,
        }
    }

    /// Create a set in the `#all` state
    pub fn all() -> Self {
        Self {
            state: SetState::All,
        }
    }

    /// Create an explicit set from values
    pub fn from_values(values: &[E]) -> Self {
        let mut set = Self::new();
        for value in values {
            set.add(*value);
        }
        set
    }

    /// Check if a value was given at all
    pub fn is_present(&self) -> bool {
        !matches!(self.state, SetState::Absent)
    }

    /// Check for the `#all` state
    pub fn is_all(&self) -> bool {
        matches!(self.state, SetState::All)
    }

    /// Check for a value; `#all` contains every value
    pub fn contains(&self, value: E) -> bool {
        match &self.state {
            SetState::Absent => false,
            SetState::Values(flags) => flags.contains(value),
            SetState::All => true,
        }
    }

    /// Add a value to the explicit set
    pub fn add(&mut self, value: E) {
        match &mut self.state {
            SetState::All => {}
            SetState::Values(flags) => flags.insert(value),
            SetState::Absent => {
                let mut flags = EnumFlags::empty();
                flags.insert(value);
                self.state = SetState::Values(flags);
            }
        }
    }

    /// Remove a value; `#all` first becomes the explicit full set
    pub fn remove(&mut self, value: E) {
        if self.is_all() {
            self.state = SetState::Values(EnumFlags::full());
        }
        if let SetState::Values(flags) = &mut self.state {
            flags.remove(value);
        }
    }

    /// Switch to the `#all` state
    pub fn set_all(&mut self) {
        self.state = SetState::All;
    }

    /// Return to the absent state
    pub fn clear(&mut self) {
        self.state = SetState::Absent;
    }

    /// Explicit values, or every value for `#all`
    pub fn values(&self) -> Vec<E> {
        match &self.state {
            SetState::Absent => Vec::new(),
            SetState::Values(flags) => flags.iter().collect(),
            SetState::All => E::VALUES.to_vec(),
        }
    }

    /// Serialize to attribute text; `None` when absent
    pub fn to_text(&self) -> Option<String> {
        match &self.state {
            SetState::Absent => None,
            SetState::All => Some(ALL_TOKEN.to_string()),
            SetState::Values(flags) => Some(
                flags
                    .iter()
                    .map(|v| v.symbol())
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
        }
    }

    /// Deserialize from attribute text, returning one message per problem
    ///
    /// Absent or blank text clears the set. `#all` alongside any other
    /// token is a single problem and leaves the set in the `#all` state.
    pub fn parse_text(&mut self, text: Option<&str>) -> Vec<String> {
        self.clear();
        let mut problems = Vec::new();
        let tokens: Vec<&str> = text.map(|t| t.split_whitespace().collect()).unwrap_or_default();
        if tokens.is_empty() {
            return problems;
        }

        if tokens.contains(&ALL_TOKEN) {
            self.set_all();
            if tokens.len() > 1 {
                problems.push(format!(
                    "'{}' cannot be combined with other values in '{}'",
                    ALL_TOKEN,
                    tokens.join(" ")
                ));
            }
            return problems;
        }

        for token in tokens {
            match parse_symbol::<E>(token) {
                Ok(value) => self.add(value),
                Err(message) => problems.push(message),
            }
        }
        problems
    }
}

impl<E: EnumSymbol> Default for AllEnumSet<E> {
    fn default() -> Self {
        Self::new()
    }
}
