//! Scope-by-scope parameter and exchange formula evaluation.

use crate::blocks::NumberFormat;
use crate::error::{Result, SimaProError};
use crate::formula::ast::Expr;
use crate::formula::eval::{EvalError, evaluate};
use crate::formula::FormulaCompiler;
use crate::models::{Block, BlockData, Exchange, ParameterRecord, Process, ProcessSection, Section};
use crate::parameters::order::evaluation_order;
use crate::uncertainty::distribution;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// File-wide parameter scopes, lowest precedence first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalScope {
    DatabaseInput,
    ProjectInput,
    DatabaseCalculated,
    ProjectCalculated,
}

impl GlobalScope {
    pub const ORDER: [GlobalScope; 4] = [
        Self::DatabaseInput,
        Self::ProjectInput,
        Self::DatabaseCalculated,
        Self::ProjectCalculated,
    ];

    fn of(data: &mut BlockData) -> Option<(Self, &mut Vec<ParameterRecord>)> {
        match data {
            BlockData::DatabaseInputParameters(rows) => Some((Self::DatabaseInput, rows)),
            BlockData::ProjectInputParameters(rows) => Some((Self::ProjectInput, rows)),
            BlockData::DatabaseCalculatedParameters(rows) => Some((Self::DatabaseCalculated, rows)),
            BlockData::ProjectCalculatedParameters(rows) => Some((Self::ProjectCalculated, rows)),
            _ => None,
        }
    }

    fn is_calculated(&self) -> bool {
        matches!(self, Self::DatabaseCalculated | Self::ProjectCalculated)
    }
}

/// Every record of one scope, across all blocks of that kind
fn scope_records(blocks: &mut [Block], scope: GlobalScope) -> Vec<&mut ParameterRecord> {
    blocks
        .iter_mut()
        .filter_map(|block| GlobalScope::of(&mut block.data))
        .filter(|(found, _)| *found == scope)
        .flat_map(|(_, rows)| rows.iter_mut())
        .collect()
}

/// Substitution table and numeric symbols built up scope by scope
#[derive(Debug, Clone)]
pub struct ParameterResolver {
    compiler: FormulaCompiler,
    numbers: NumberFormat,
    prefix: String,
    /// Uppercased original name -> current alias
    substitutes: HashMap<String, String>,
    /// Alias -> resolved amount
    symbols: HashMap<String, f64>,
}

impl ParameterResolver {
    pub fn new(numbers: NumberFormat, prefix: impl Into<String>) -> Self {
        Self {
            compiler: FormulaCompiler::new(numbers.decimal_separator()),
            numbers,
            prefix: prefix.into(),
            substitutes: HashMap::new(),
            symbols: HashMap::new(),
        }
    }

    /// Uppercased, prefixed alias for a parameter name
    pub fn alias(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name).to_uppercase()
    }

    pub fn substitutes(&self) -> &HashMap<String, String> {
        &self.substitutes
    }

    pub fn symbols(&self) -> &HashMap<String, f64> {
        &self.symbols
    }

    /// Resolved amount of a parameter by its original name
    pub fn value_of(&self, name: &str) -> Option<f64> {
        let alias = self.substitutes.get(&name.to_uppercase())?;
        self.symbols.get(alias).copied()
    }

    fn register(&mut self, parameter: &mut ParameterRecord) {
        parameter.name = self.alias(&parameter.original_name);
        self.substitutes
            .insert(parameter.original_name.to_uppercase(), parameter.name.clone());
    }

    /// Add literal input parameters to the current scope
    pub fn add_inputs<'a>(&mut self, parameters: impl IntoIterator<Item = &'a mut ParameterRecord>) {
        for parameter in parameters {
            self.register(parameter);
            self.symbols.insert(parameter.name.clone(), parameter.amount);
        }
    }

    /// Rewrite and evaluate one scope of calculated parameters
    ///
    /// Formulas may reference each other inside the scope; they're evaluated
    /// in dependency order. Names from outer scopes must already be known.
    pub fn add_calculated<'a>(
        &mut self,
        parameters: impl IntoIterator<Item = &'a mut ParameterRecord>,
    ) -> Result<()> {
        let mut parameters: Vec<&mut ParameterRecord> = parameters.into_iter().collect();
        for parameter in parameters.iter_mut() {
            self.register(parameter);
        }

        let mut exprs = Vec::with_capacity(parameters.len());
        for parameter in parameters.iter_mut() {
            let Some(formula) = parameter.formula.clone() else {
                exprs.push(None);
                continue;
            };
            let (text, expr) = self.rewrite(&formula, parameter.line_no)?;
            if text != formula {
                if parameter.original_formula.is_none() {
                    parameter.original_formula = Some(formula);
                }
                parameter.formula = Some(text);
            }
            exprs.push(Some(expr));
        }

        let order = {
            let names: Vec<&str> = parameters.iter().map(|p| p.name.as_str()).collect();
            let dependencies: Vec<Vec<&str>> = exprs
                .iter()
                .map(|expr| expr.as_ref().map(Expr::identifiers).unwrap_or_default())
                .collect();
            evaluation_order(&names, &dependencies)?
        };

        for i in order {
            let parameter = &mut parameters[i];
            if let Some(expr) = &exprs[i] {
                match self.evaluate(expr, &parameter.original_name, parameter.line_no)? {
                    Some(amount) => parameter.amount = amount,
                    None => {
                        warn!(
                            "Division by zero in parameter '{}' on line {}; setting it to zero",
                            parameter.original_name, parameter.line_no
                        );
                        parameter.amount = 0.0;
                        parameter.zero_division_formula = parameter.formula.take();
                    }
                }
            }
            self.symbols.insert(parameter.name.clone(), parameter.amount);
        }
        Ok(())
    }

    /// Resolve every parameter scope in the file, then every process
    pub fn resolve_blocks(&mut self, blocks: &mut [Block]) -> Result<()> {
        for scope in GlobalScope::ORDER {
            let records = scope_records(blocks, scope);
            if records.is_empty() {
                continue;
            }
            debug!("Resolving {} {:?} parameters", records.len(), scope);
            if scope.is_calculated() {
                self.add_calculated(records)?;
            } else {
                self.add_inputs(records);
            }
        }

        let mut count = 0;
        for process in blocks.iter_mut().filter_map(Block::as_process_mut) {
            self.resolve_process(process)?;
            count += 1;
        }
        info!("Resolved parameters and formulas for {} processes", count);
        Ok(())
    }

    /// Resolve local parameters, then exchange formulas and uncertainty
    ///
    /// Local parameters only extend a copy of the file-wide scope, so
    /// processes never see each other's names.
    pub fn resolve_process(&self, process: &mut Process) -> Result<()> {
        let mut local = self.clone();

        if let Some(Section::Parameters(rows)) =
            process.sections.get_mut(&ProcessSection::InputParameters)
        {
            local.add_inputs(rows.iter_mut());
        }
        if let Some(Section::Parameters(rows)) =
            process.sections.get_mut(&ProcessSection::CalculatedParameters)
        {
            local.add_calculated(rows.iter_mut())?;
        }

        for exchange in process.all_exchanges_mut() {
            local.resolve_exchange(exchange)?;
            attach_uncertainty(exchange, &local.numbers)?;
        }
        Ok(())
    }

    /// Evaluate the amount and allocation formulas of one exchange
    pub fn resolve_exchange(&self, exchange: &mut Exchange) -> Result<()> {
        if let Some(formula) = exchange.formula.clone() {
            let (text, expr) = self.rewrite(&formula, exchange.line_no)?;
            if text != formula {
                if exchange.original_formula.is_none() {
                    exchange.original_formula = Some(formula);
                }
                exchange.formula = Some(text);
            }
            match self.evaluate(&expr, &exchange.name, exchange.line_no)? {
                Some(amount) => exchange.amount = amount,
                None => {
                    warn!(
                        "Division by zero in amount of '{}' on line {}; setting it to zero",
                        exchange.name, exchange.line_no
                    );
                    exchange.amount = 0.0;
                    exchange.zero_division_formula = exchange.formula.take();
                }
            }
        }

        if let Some(formula) = exchange.allocation_formula.clone() {
            let (text, expr) = self.rewrite(&formula, exchange.line_no)?;
            if text != formula {
                if exchange.original_allocation_formula.is_none() {
                    exchange.original_allocation_formula = Some(formula);
                }
                exchange.allocation_formula = Some(text);
            }
            let allocation = self.evaluate(&expr, &exchange.name, exchange.line_no)?;
            if allocation.is_none() {
                warn!(
                    "Division by zero in allocation of '{}' on line {}; setting it to zero",
                    exchange.name, exchange.line_no
                );
            }
            exchange.allocation = Some(allocation.unwrap_or(0.0));
        }
        Ok(())
    }

    fn rewrite(&self, formula: &str, line_no: usize) -> Result<(String, Expr)> {
        let compiled = self.compiler.compile(formula, line_no)?;
        self.compiler.rename(&compiled, &self.substitutes, line_no)
    }

    /// `None` when the formula divides by zero
    fn evaluate(&self, expr: &Expr, owner: &str, line_no: usize) -> Result<Option<f64>> {
        match evaluate(expr, &self.symbols) {
            Ok(value) => Ok(Some(value)),
            Err(EvalError::DivisionByZero) => Ok(None),
            Err(EvalError::UndefinedSymbol(symbol)) => Err(SimaProError::UndefinedSymbol {
                symbol,
                owner: owner.to_string(),
                line_no,
            }),
            Err(other) => Err(SimaProError::FormulaSyntax {
                formula: expr.to_string(),
                line_no,
                reason: other.to_string(),
            }),
        }
    }
}

/// Turn raw uncertainty cells into a distribution around the final amount
pub fn attach_uncertainty(exchange: &mut Exchange, numbers: &NumberFormat) -> Result<()> {
    if let Some(raw) = exchange.raw_uncertainty.take() {
        exchange.uncertainty = Some(distribution(
            exchange.amount,
            &raw,
            numbers,
            exchange.line_no,
        )?);
    }
    Ok(())
}
