use super::error::FragTreeError;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

lazy_static! {
    static ref RE_ELEMENT: Regex = Regex::new(r"([A-Z][a-z]?)(\d*)").unwrap();
}

/// Molecular formula as element counts.
///
/// Counts may become negative through [`Formula::sub`]; parsed formulas are
/// never negative. Arithmetic is checked, a count beyond `i32` is an error.
///
/// ```
/// use ftalign::libs::fragtree::Formula;
///
/// let parent: Formula = "C8H10O".parse().unwrap();
/// let child: Formula = "C7H7".parse().unwrap();
/// let loss = parent.sub(&child).unwrap();
/// assert_eq!(loss.to_string(), "CH3O");
/// assert_eq!(loss.non_hydrogen(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Formula {
    counts: BTreeMap<String, i32>,
}

impl Formula {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, element: &str) -> i32 {
        self.counts.get(element).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn is_non_negative(&self) -> bool {
        self.counts.values().all(|&c| c >= 0)
    }

    /// Number of atoms other than hydrogen.
    pub fn non_hydrogen(&self) -> i64 {
        self.counts
            .iter()
            .filter(|(e, _)| e.as_str() != "H")
            .map(|(_, &c)| i64::from(c))
            .sum()
    }

    /// Non-hydrogen atoms in which the two formulas differ.
    pub fn distance(&self, other: &Formula) -> i64 {
        self.counts
            .keys()
            .chain(other.counts.keys().filter(|e| !self.counts.contains_key(*e)))
            .filter(|e| e.as_str() != "H")
            .map(|e| (i64::from(self.count(e)) - i64::from(other.count(e))).abs())
            .sum()
    }

    pub fn add(&self, other: &Formula) -> Result<Formula, FragTreeError> {
        self.combine(other, i32::checked_add)
    }

    pub fn sub(&self, other: &Formula) -> Result<Formula, FragTreeError> {
        self.combine(other, i32::checked_sub)
    }

    fn combine<F>(&self, other: &Formula, op: F) -> Result<Formula, FragTreeError>
    where
        F: Fn(i32, i32) -> Option<i32>,
    {
        let mut counts = self.counts.clone();
        for (element, &c) in &other.counts {
            let count = counts.entry(element.clone()).or_insert(0);
            *count = op(*count, c).ok_or_else(|| overflow(self, other))?;
        }
        counts.retain(|_, c| *c != 0);
        Ok(Formula { counts })
    }
}

fn overflow(left: &Formula, right: &Formula) -> FragTreeError {
    FragTreeError::FormulaError(format!("atom count overflow: {} and {}", left, right))
}

impl FromStr for Formula {
    type Err = FragTreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut counts = BTreeMap::new();
        let mut consumed = 0;
        for cap in RE_ELEMENT.captures_iter(s) {
            let whole = cap.get(0).map_or("", |m| m.as_str());
            if cap.get(0).map_or(0, |m| m.start()) != consumed {
                break;
            }
            consumed += whole.len();
            let count = match &cap[2] {
                "" => 1,
                n => n
                    .parse::<i32>()
                    .map_err(|e| FragTreeError::FormulaError(format!("{}: {}", s, e)))?,
            };
            let total = counts.entry(cap[1].to_string()).or_insert(0i32);
            *total = total.checked_add(count).ok_or_else(|| {
                FragTreeError::FormulaError(format!("atom count overflow: \"{}\"", s))
            })?;
        }
        if s.is_empty() || consumed != s.len() {
            return Err(FragTreeError::FormulaError(format!(
                "not a molecular formula: \"{}\"",
                s
            )));
        }
        counts.retain(|_, c| *c != 0);
        Ok(Formula { counts })
    }
}

/// Hill order: carbon, hydrogen, then the rest alphabetically. Without
/// carbon everything is alphabetical.
impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut elements: Vec<&String> = self.counts.keys().collect();
        if self.counts.contains_key("C") {
            elements.sort_by_key(|e| match e.as_str() {
                "C" => (0, e.as_str()),
                "H" => (1, e.as_str()),
                _ => (2, e.as_str()),
            });
        }
        for element in elements {
            match self.counts[element] {
                1 => write!(f, "{}", element)?,
                c => write!(f, "{}{}", element, c)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let f: Formula = "C6H12O6".parse().unwrap();
        assert_eq!(f.count("C"), 6);
        assert_eq!(f.count("H"), 12);
        assert_eq!(f.count("N"), 0);
        assert_eq!(f.non_hydrogen(), 12);

        let f: Formula = "ClCH2Br".parse().unwrap();
        assert_eq!(f.to_string(), "CH2BrCl");

        let f: Formula = "H2O".parse().unwrap();
        assert_eq!(f.to_string(), "H2O");

        assert!("".parse::<Formula>().is_err());
        assert!("C6x".parse::<Formula>().is_err());
        assert!("6C".parse::<Formula>().is_err());
        assert!("c6h6".parse::<Formula>().is_err());
    }

    #[test]
    fn test_arithmetic() {
        let a: Formula = "C7H7".parse().unwrap();
        let b: Formula = "C5H5".parse().unwrap();
        let loss = a.sub(&b).unwrap();
        assert_eq!(loss.to_string(), "C2H2");
        assert_eq!(loss.add(&b).unwrap(), a);
        assert!(!b.sub(&a).unwrap().is_non_negative());
        assert!(a.sub(&a).unwrap().is_empty());

        let co: Formula = "CO".parse().unwrap();
        let c2h4: Formula = "C2H4".parse().unwrap();
        // C: 1 vs 2, O: 1 vs 0
        assert_eq!(co.distance(&c2h4), 2);
        assert_eq!(co.distance(&co), 0);
    }

    #[test]
    fn test_overflow() {
        let max: Formula = "C2147483647".parse().unwrap();
        let one: Formula = "C".parse().unwrap();
        assert!(matches!(max.add(&one), Err(FragTreeError::FormulaError(_))));
        assert!(max.sub(&one).is_ok());

        assert!(matches!(
            "C2147483647C".parse::<Formula>(),
            Err(FragTreeError::FormulaError(_))
        ));
        assert!("C2147483648".parse::<Formula>().is_err());

        // wide sums do not wrap
        let other: Formula = "H2O2147483647".parse().unwrap();
        assert_eq!(max.distance(&other), 2 * 2147483647);
        let both = max.add(&"O2147483647".parse().unwrap()).unwrap();
        assert_eq!(both.non_hydrogen(), 2 * 2147483647);
    }
}
