//! A small SMILES-subset reader for building graphs in tests and the demo
//! binary. It understands the organic subset, aromatic lowercase atoms,
//! bracket atoms (isotope, chirality, hydrogen count, charge, atom-map class),
//! explicit bonds, branches, ring closures and `.` fragment separators.

use std::collections::BTreeMap;

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, digit1, one_of, satisfy},
    combinator::{all_consuming, map, map_res, opt, recognize},
    multi::many0_count,
    sequence::{pair, preceded},
    IResult,
};
use tracing::*;

use crate::{Atom, BondOrder, Chirality, Element, MolecularGraph, SmilesError};

type Res<'a, T> = IResult<&'a str, T>;

#[derive(Debug, Clone, PartialEq)]
struct BracketAtom {
    element: Element,
    aromatic: bool,
    chirality: Option<Chirality>,
    hydrogens: u8,
    charge: i8,
    map_class: Option<u32>,
}

fn bracket_symbol(input: &str) -> Res<(&str, bool)> {
    alt((
        map(alt((tag("se"), tag("c"), tag("n"), tag("o"), tag("s"), tag("p"), tag("b"))), |s| {
            (s, true)
        }),
        map(
            recognize(pair(
                satisfy(|c| c.is_ascii_uppercase()),
                opt(satisfy(|c| c.is_ascii_lowercase())),
            )),
            |s| (s, false),
        ),
    ))(input)
}

fn chirality(input: &str) -> Res<Chirality> {
    alt((
        map(tag("@@"), |_| Chirality::Clockwise),
        map(tag("@"), |_| Chirality::CounterClockwise),
    ))(input)
}

fn hydrogen_count(input: &str) -> Res<u8> {
    preceded(
        char('H'),
        map(opt(map_res(digit1, |d: &str| d.parse::<u8>())), |n| n.unwrap_or(1)),
    )(input)
}

fn charge(input: &str) -> Res<i8> {
    let (input, sign) = one_of("+-")(input)?;
    let (input, magnitude) = alt((
        map_res(digit1, |d: &str| d.parse::<i8>()),
        map_res(many0_count(char(sign)), |extra| i8::try_from(extra + 1)),
    ))(input)?;
    Ok((input, if sign == '-' { -magnitude } else { magnitude }))
}

fn map_class(input: &str) -> Res<u32> {
    preceded(char(':'), map_res(digit1, |d: &str| d.parse::<u32>()))(input)
}

type BracketParts<'a> = (&'a str, bool, Option<Chirality>, Option<u8>, Option<i8>, Option<u32>);

fn bracket_parts(input: &str) -> Res<BracketParts> {
    let (input, _isotope) = opt(digit1)(input)?;
    let (input, (symbol, aromatic)) = bracket_symbol(input)?;
    let (input, chirality) = opt(chirality)(input)?;
    let (input, hydrogens) = opt(hydrogen_count)(input)?;
    let (input, charge) = opt(charge)(input)?;
    let (input, map_class) = opt(map_class)(input)?;
    Ok((input, (symbol, aromatic, chirality, hydrogens, charge, map_class)))
}

fn parse_bracket_atom(content: &str) -> Result<BracketAtom, SmilesError> {
    let (_, (symbol, aromatic, chirality, hydrogens, charge, map_class)) =
        all_consuming(bracket_parts)(content)
            .map_err(|_| SmilesError::BadBracketAtom(content.to_string()))?;

    let element = if aromatic {
        let mut upper = symbol.to_string();
        upper[..1].make_ascii_uppercase();
        Element::from_symbol(&upper)?
    } else {
        Element::from_symbol(symbol)?
    };
    Ok(BracketAtom {
        element,
        aromatic,
        chirality,
        hydrogens: hydrogens.unwrap_or(0),
        charge: charge.unwrap_or(0),
        map_class,
    })
}

/// Default valence of organic-subset atoms, used to fill implicit hydrogens.
fn default_valence(element: Element) -> u32 {
    match element {
        Element::B | Element::N | Element::P => 3,
        Element::C => 4,
        Element::O | Element::S => 2,
        _ => 1,
    }
}

/// Parses a SMILES string into a molecular graph.
pub fn parse_smiles(smiles: &str) -> Result<MolecularGraph, SmilesError> {
    let mut graph = MolecularGraph::new();
    let mut ring_closures: BTreeMap<String, (usize, Option<BondOrder>)> = BTreeMap::new();
    let mut branch_stack: Vec<usize> = Vec::new();
    let mut pending_bond: Option<BondOrder> = None;
    let mut current_atom: Option<usize> = None;
    // Atoms written outside brackets get implicit hydrogens afterwards.
    let mut implicit: Vec<usize> = Vec::new();

    let chars: Vec<char> = smiles.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '(' => {
                let atom = current_atom.ok_or(SmilesError::BranchNoCurrentAtom(i))?;
                branch_stack.push(atom);
                i += 1;
            }
            ')' => {
                current_atom = Some(branch_stack.pop().ok_or(SmilesError::BranchEndNoStart(i))?);
                i += 1;
            }
            '-' | '/' | '\\' => {
                pending_bond = Some(BondOrder::Single);
                i += 1;
            }
            '=' => {
                pending_bond = Some(BondOrder::Double);
                i += 1;
            }
            '#' => {
                pending_bond = Some(BondOrder::Triple);
                i += 1;
            }
            ':' => {
                pending_bond = Some(BondOrder::Aromatic);
                i += 1;
            }
            '.' => {
                current_atom = None;
                pending_bond = None;
                i += 1;
            }
            '%' | '0'..='9' => {
                let (label, consumed) = if c == '%' {
                    let digits: String = chars.iter().skip(i + 1).take(2).collect();
                    if digits.len() != 2 || !digits.chars().all(|d| d.is_ascii_digit()) {
                        return Err(SmilesError::UnexpectedCharacter(c, i));
                    }
                    (digits, 3)
                } else {
                    (c.to_string(), 1)
                };
                let current = current_atom.ok_or(SmilesError::RingClosureNoCurrentAtom(c, i))?;
                if let Some((opening, opening_bond)) = ring_closures.remove(&label) {
                    let order = pending_bond
                        .take()
                        .or(opening_bond)
                        .unwrap_or_else(|| implied_bond(&graph, opening, current));
                    graph.add_bond(opening, current, order)?;
                } else {
                    ring_closures.insert(label, (current, pending_bond.take()));
                }
                i += consumed;
            }
            '[' => {
                let close = chars[i..]
                    .iter()
                    .position(|&ch| ch == ']')
                    .map(|offset| i + offset)
                    .ok_or(SmilesError::UnclosedBracket(i))?;
                let content: String = chars[i + 1..close].iter().collect();
                let bracket = parse_bracket_atom(&content)?;
                let mut atom = Atom::new(bracket.element);
                atom.aromatic = bracket.aromatic;
                atom.chirality = bracket.chirality;
                atom.hydrogens = bracket.hydrogens;
                atom.charge = bracket.charge;
                atom.map_class = bracket.map_class;
                atom.id = bracket.map_class.map(|class| class.to_string().into());
                let index = graph.add_atom(atom);
                connect(&mut graph, current_atom, index, pending_bond.take())?;
                current_atom = Some(index);
                i = close + 1;
            }
            c if c.is_ascii_alphabetic() => {
                let (symbol, aromatic, consumed) = match (c, chars.get(i + 1)) {
                    ('C', Some('l')) => ("Cl".to_string(), false, 2),
                    ('B', Some('r')) => ("Br".to_string(), false, 2),
                    (c, _) if c.is_ascii_lowercase() => (c.to_ascii_uppercase().to_string(), true, 1),
                    (c, _) => (c.to_string(), false, 1),
                };
                let element = Element::from_symbol(&symbol)?;
                if !element.is_organic_subset() {
                    return Err(SmilesError::UnexpectedCharacter(c, i));
                }
                let mut atom = Atom::new(element);
                atom.aromatic = aromatic;
                let index = graph.add_atom(atom);
                implicit.push(index);
                connect(&mut graph, current_atom, index, pending_bond.take())?;
                current_atom = Some(index);
                i += consumed;
            }
            _ => return Err(SmilesError::UnexpectedCharacter(c, i)),
        }
    }

    if !branch_stack.is_empty() {
        return Err(SmilesError::UnclosedBranch);
    }
    if !ring_closures.is_empty() {
        let open = ring_closures.keys().filter_map(|label| label.chars().last()).collect();
        return Err(SmilesError::UnclosedRing(open));
    }

    for index in implicit {
        let half_units: u32 = graph.bonded(index).map(|(_, order)| order.half_units()).sum();
        let used = (half_units + 1) / 2;
        let valence = default_valence(graph.atom(index).element);
        graph.atom_mut(index).hydrogens = valence.saturating_sub(used) as u8;
    }

    trace!("Parsed SMILES {smiles} into {} atoms", graph.atom_count());
    Ok(graph)
}

fn implied_bond(graph: &MolecularGraph, a: usize, b: usize) -> BondOrder {
    if graph.atom(a).aromatic && graph.atom(b).aromatic {
        BondOrder::Aromatic
    } else {
        BondOrder::Single
    }
}

fn connect(
    graph: &mut MolecularGraph,
    previous: Option<usize>,
    current: usize,
    bond: Option<BondOrder>,
) -> Result<(), SmilesError> {
    if let Some(previous) = previous {
        let order = bond.unwrap_or_else(|| implied_bond(graph, previous, current));
        graph.add_bond(previous, current, order)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ethanol() {
        let molecule = parse_smiles("CCO").expect("Failed to parse SMILES");
        assert_eq!(molecule.atom_count(), 3);
        assert_eq!(molecule.atom(0).element, Element::C);
        assert_eq!(molecule.atom(2).element, Element::O);
        assert_eq!(molecule.bond_count(), 2);
        assert_eq!(molecule.atom(0).hydrogens, 3);
        assert_eq!(molecule.atom(2).hydrogens, 1);
    }

    #[test]
    fn test_parse_rings_and_branches() {
        let acetic = parse_smiles("CC(=O)O").unwrap();
        assert_eq!(acetic.bond_between(1, 2), Some(BondOrder::Double));
        assert_eq!(acetic.bond_between(1, 3), Some(BondOrder::Single));

        let benzene = parse_smiles("c1ccccc1").unwrap();
        assert_eq!(benzene.bond_count(), 6);
        assert!(benzene.bonds().all(|(_, _, order)| order == BondOrder::Aromatic));
        assert!(benzene.atoms().all(|atom| atom.hydrogens == 1));

        let cyclohexene = parse_smiles("C1=CCCCC1").unwrap();
        assert_eq!(cyclohexene.bond_between(0, 1), Some(BondOrder::Double));
        assert_eq!(cyclohexene.bond_between(0, 5), Some(BondOrder::Single));
    }

    #[test]
    fn test_parse_bracket_atoms() {
        let molecule = parse_smiles("[NH4+:7].[O-2]").unwrap();
        let ammonium = molecule.atom(0);
        assert_eq!(ammonium.element, Element::N);
        assert_eq!(ammonium.hydrogens, 4);
        assert_eq!(ammonium.charge, 1);
        assert_eq!(ammonium.map_class, Some(7));
        assert_eq!(ammonium.id.as_ref().map(|id| id.as_str()), Some("7"));
        assert_eq!(molecule.atom(1).charge, -2);

        let chiral = parse_smiles("N[C@@H](C)C(=O)O").unwrap();
        assert_eq!(chiral.atom(1).chirality, Some(Chirality::Clockwise));
        assert_eq!(chiral.atom(1).hydrogens, 1);

        let pyrrole = parse_smiles("c1cc[nH]c1").unwrap();
        assert!(pyrrole.atom(3).aromatic);
        assert_eq!(pyrrole.atom(3).hydrogens, 1);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_smiles("C(C").unwrap_err(), SmilesError::UnclosedBranch);
        assert_eq!(parse_smiles(")C").unwrap_err(), SmilesError::BranchEndNoStart(0));
        assert_eq!(parse_smiles("C1CC").unwrap_err(), SmilesError::UnclosedRing(vec!['1']));
        assert_eq!(parse_smiles("C[N").unwrap_err(), SmilesError::UnclosedBracket(1));
        assert!(matches!(parse_smiles("C[Xq]"), Err(SmilesError::Graph(_))));
        assert!(matches!(parse_smiles("C[C@@@]"), Err(SmilesError::BadBracketAtom(_))));
    }

    #[test]
    fn test_repeated_charge_signs() {
        assert_eq!(parse_smiles("[Fe+++]").unwrap().atom(0).charge, 3);
        assert_eq!(parse_smiles("[O--]").unwrap().atom(0).charge, -2);
        let many = format!("[Fe{}]", "+".repeat(127));
        assert_eq!(parse_smiles(&many).unwrap().atom(0).charge, 127);
        let too_many = format!("[Fe{}]", "+".repeat(128));
        assert!(matches!(parse_smiles(&too_many), Err(SmilesError::BadBracketAtom(_))));
    }
}
