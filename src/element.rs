use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

use lazy_static::lazy_static;

use crate::GraphError;

/// The elements a reaction graph may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Element {
    H,
    Li,
    B,
    C,
    N,
    O,
    F,
    Na,
    Mg,
    Si,
    P,
    S,
    Cl,
    K,
    Ca,
    Fe,
    Zn,
    Se,
    Br,
    I,
}

const ALL_ELEMENTS: [Element; 20] = [
    Element::H,
    Element::Li,
    Element::B,
    Element::C,
    Element::N,
    Element::O,
    Element::F,
    Element::Na,
    Element::Mg,
    Element::Si,
    Element::P,
    Element::S,
    Element::Cl,
    Element::K,
    Element::Ca,
    Element::Fe,
    Element::Zn,
    Element::Se,
    Element::Br,
    Element::I,
];

lazy_static! {
    static ref ELEMENTS_BY_SYMBOL: BTreeMap<&'static str, Element> =
        ALL_ELEMENTS.iter().map(|element| (element.symbol(), *element)).collect();
}

impl Element {
    pub fn symbol(&self) -> &'static str {
        use Element::*;
        match self {
            H => "H",
            Li => "Li",
            B => "B",
            C => "C",
            N => "N",
            O => "O",
            F => "F",
            Na => "Na",
            Mg => "Mg",
            Si => "Si",
            P => "P",
            S => "S",
            Cl => "Cl",
            K => "K",
            Ca => "Ca",
            Fe => "Fe",
            Zn => "Zn",
            Se => "Se",
            Br => "Br",
            I => "I",
        }
    }

    /// Look up an element by its (case-sensitive) symbol.
    pub fn from_symbol(symbol: &str) -> Result<Self, GraphError> {
        ELEMENTS_BY_SYMBOL
            .get(symbol)
            .copied()
            .ok_or_else(|| GraphError::UnknownElement(symbol.to_string()))
    }

    /// Largest number of bond-order units the element accepts in a neutral state.
    ///
    /// Hypervalent states of P and S are admitted; metals get their usual
    /// ionic valence.
    pub fn max_valence(&self) -> u32 {
        use Element::*;
        match self {
            H | Li | F | Na | K | Cl | Br | I => 1,
            Mg | Ca | Zn | O => 2,
            B | Fe => 3,
            C | Si => 4,
            N => 4,
            P => 5,
            S | Se => 6,
        }
    }

    /// Heteroatoms that donate a lone pair to a five-membered aromatic ring.
    pub fn has_lone_pair(&self) -> bool {
        matches!(self, Element::N | Element::O | Element::S | Element::Se)
    }

    /// Elements the SMILES organic subset allows outside brackets.
    pub fn is_organic_subset(&self) -> bool {
        use Element::*;
        matches!(self, B | C | N | O | P | S | F | Cl | Br | I)
    }

    pub fn atomic_number(&self) -> u8 {
        use Element::*;
        match self {
            H => 1,
            Li => 3,
            B => 5,
            C => 6,
            N => 7,
            O => 8,
            F => 9,
            Na => 11,
            Mg => 12,
            Si => 14,
            P => 15,
            S => 16,
            Cl => 17,
            K => 19,
            Ca => 20,
            Fe => 26,
            Zn => 30,
            Se => 34,
            Br => 35,
            I => 53,
        }
    }
}

impl Display for Element {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}", self.symbol())
    }
}
