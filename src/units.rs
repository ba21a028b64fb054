//! Unit normalization for process exchanges
//!
//! Builds a registry from every `Units` block in the file and converts each
//! exchange to the reference unit of its dimension. Amounts and formulas are
//! multiplied by the conversion factor and uncertainty distributions are
//! rescaled with it. The original unit and factor are kept on the exchange.

use crate::models::{Block, BlockData, Exchange, UnitConversion, UnitDefinition};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Unit definitions keyed by unit name
#[derive(Debug, Clone, Default)]
pub struct UnitRegistry {
    units: HashMap<String, UnitDefinition>,
}

impl UnitRegistry {
    /// Collect the definitions of every `Units` block
    ///
    /// The first definition of a name wins. Conflicting factors for one name
    /// and reference units with a factor other than 1 are reported but kept.
    pub fn from_blocks(blocks: &[Block]) -> Self {
        let definitions = blocks.iter().filter_map(|block| match &block.data {
            BlockData::Units(units) => Some(units.iter()),
            _ => None,
        });
        Self::from_definitions(definitions.flatten())
    }

    pub fn from_definitions<'a>(definitions: impl IntoIterator<Item = &'a UnitDefinition>) -> Self {
        let mut units: HashMap<String, UnitDefinition> = HashMap::new();

        for unit in definitions {
            if unit.name == unit.reference_unit_name && unit.conversion != 1.0 {
                warn!(
                    "Reference unit '{}' on line {} has conversion factor {} instead of 1",
                    unit.name, unit.line_no, unit.conversion
                );
            }
            match units.get(&unit.name) {
                Some(existing) if existing.conversion != unit.conversion => {
                    warn!(
                        "Unit '{}' has conflicting conversion factors: {} (line {}) and {} (line {}); using the first",
                        unit.name, existing.conversion, existing.line_no, unit.conversion, unit.line_no
                    );
                }
                Some(_) => {}
                None => {
                    units.insert(unit.name.clone(), unit.clone());
                }
            }
        }

        Self { units }
    }

    pub fn get(&self, name: &str) -> Option<&UnitDefinition> {
        self.units.get(name)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Convert one exchange to its reference unit
    ///
    /// # Arguments
    /// * `exchange` - Exchange to rewrite in place
    /// * `warned` - Unknown unit names already reported in this session
    ///
    /// # Returns
    /// `true` when the exchange was converted
    pub fn normalize_exchange(&self, exchange: &mut Exchange, warned: &mut HashSet<String>) -> bool {
        let Some(unit) = self.units.get(&exchange.unit) else {
            if warned.insert(exchange.unit.clone()) {
                warn!(
                    "Unknown unit '{}' used on line {}",
                    exchange.unit, exchange.line_no
                );
            }
            return false;
        };
        if unit.reference_unit_name == exchange.unit {
            return false;
        }

        let factor = unit.conversion;
        debug!(
            "Changing units from {} to {} with conversion factor {} on line {}",
            exchange.unit, unit.reference_unit_name, factor, exchange.line_no
        );

        let original_unit = std::mem::replace(&mut exchange.unit, unit.reference_unit_name.clone());
        exchange.unit_conversion = Some(UnitConversion {
            original_unit,
            factor,
        });
        exchange.amount *= factor;
        if let Some(formula) = &exchange.formula {
            exchange.formula = Some(format!("({}) * {}", formula, factor));
        }
        if let Some(uncertainty) = &exchange.uncertainty {
            exchange.uncertainty = Some(uncertainty.rescale(factor));
        }
        true
    }

    /// Convert every exchange of every process; returns how many changed
    pub fn normalize_blocks(&self, blocks: &mut [Block], warned: &mut HashSet<String>) -> usize {
        let mut converted = 0;
        for process in blocks.iter_mut().filter_map(Block::as_process_mut) {
            for exchange in process.all_exchanges_mut() {
                if self.normalize_exchange(exchange, warned) {
                    converted += 1;
                }
            }
        }
        info!(
            "Normalized {} exchanges using {} unit definitions",
            converted,
            self.units.len()
        );
        converted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uncertainty::UncertaintyDistribution;

    fn unit(name: &str, conversion: f64, reference: &str, line_no: usize) -> UnitDefinition {
        UnitDefinition {
            name: name.to_string(),
            dimension: "Mass".to_string(),
            conversion,
            reference_unit_name: reference.to_string(),
            line_no,
        }
    }

    fn registry() -> UnitRegistry {
        let units = [unit("kg", 1.0, "kg", 1), unit("g", 0.001, "kg", 2)];
        UnitRegistry::from_definitions(units.iter())
    }

    #[test]
    fn test_literal_amount_conversion() {
        let mut edge = Exchange::new("sand", "g", 10);
        edge.amount = 1000.0;
        let mut warned = HashSet::new();

        assert!(registry().normalize_exchange(&mut edge, &mut warned));
        assert_eq!(edge.unit, "kg");
        assert_eq!(edge.amount, 1.0);
        assert_eq!(
            edge.unit_conversion,
            Some(UnitConversion {
                original_unit: "g".to_string(),
                factor: 0.001,
            })
        );
    }

    #[test]
    fn test_formula_and_uncertainty_conversion() {
        let mut edge = Exchange::new("soil", "g", 3);
        edge.amount = 1000.0;
        edge.formula = Some("foo * bar".to_string());
        edge.uncertainty = Some(UncertaintyDistribution::Triangular {
            amount: 1000.0,
            loc: 1000.0,
            minimum: 500.0,
            maximum: 1500.0,
            negative: false,
        });

        registry().normalize_exchange(&mut edge, &mut HashSet::new());
        assert_eq!(edge.formula.as_deref(), Some("(foo * bar) * 0.001"));
        assert_eq!(
            edge.uncertainty,
            Some(UncertaintyDistribution::Triangular {
                amount: 1.0,
                loc: 1.0,
                minimum: 0.5,
                maximum: 1.5,
                negative: false,
            })
        );
    }

    #[test]
    fn test_reference_unit_untouched() {
        let mut edge = Exchange::new("sand", "kg", 1);
        edge.amount = 2.0;
        assert!(!registry().normalize_exchange(&mut edge, &mut HashSet::new()));
        assert_eq!(edge.amount, 2.0);
        assert_eq!(edge.unit_conversion, None);
    }

    #[test]
    fn test_unknown_unit_warned_once() {
        let registry = registry();
        let mut warned = HashSet::new();
        let mut first = Exchange::new("a", "furlong", 1);
        let mut second = Exchange::new("b", "furlong", 2);

        assert!(!registry.normalize_exchange(&mut first, &mut warned));
        assert!(!registry.normalize_exchange(&mut second, &mut warned));
        assert_eq!(warned.len(), 1);
        assert_eq!(second.unit, "furlong");
    }

    #[test]
    fn test_first_definition_wins() {
        let units = [unit("t", 1000.0, "kg", 1), unit("t", 907.0, "kg", 5)];
        let registry = UnitRegistry::from_definitions(units.iter());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("t").map(|u| u.conversion), Some(1000.0));
    }
}
