//! Model loading: declarations are checked and registered in order, then frozen.
//!
//! ```
//! use agora::ast::{ConstantDecl, Expression, BinaryOperator, Location};
//! use agora::core::Value;
//! use agora::model::ModelBuilder;
//!
//! let mut builder = ModelBuilder::new();
//! builder.declare_constant(&ConstantDecl {
//!     name: "x".to_string(),
//!     value: Expression::binary(BinaryOperator::Add, Expression::integer(1), Expression::integer(2)),
//!     location: Location::new(1, 1),
//! });
//! let model = builder.build().unwrap();
//! assert_eq!(model.constant("x"), Some(&Value::Integer(3)));
//! ```

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::ast::{
    ConstantDecl, ElementDecl, Expression, FunctionDecl, GroupDecl, Location, ParameterDecl,
    RecordDecl,
};
use crate::config::EngineConfig;
use crate::core::registry::{
    ElementName, ElementNameRegistry, ElementNameRegistryBuilder, RegistryError, Variable,
    VariableMapping, VariableRegistry, VariableRegistryBuilder,
};
use crate::core::types::Type;
use crate::core::value::Value;
use crate::error::{Error, InternalResult};
use crate::eval::{evaluate_constant, CompileError, CompiledFunction, Evaluator, ExpressionCompiler};
use crate::type_checker::{
    FunctionSignature, ScopeKind, SymbolTable, TypeCheckError, TypeChecker,
    TypeContext, TypeScope,
};

/// Collects declarations, reporting every error at once in [`ModelBuilder::build`].
pub struct ModelBuilder {
    config: EngineConfig,
    symbols: SymbolTable,
    variables: VariableRegistryBuilder,
    elements: ElementNameRegistryBuilder,
    constants: HashMap<String, Value>,
    functions: HashMap<String, CompiledFunction>,
    // Parameter values replacing declared defaults, consumed by `declare_parameter`.
    overrides: HashMap<String, f64>,
    // Constants and functions read no attributes, so they compile against empty registries.
    no_variables: VariableRegistry,
    no_elements: ElementNameRegistry,
    errors: TypeContext,
}

impl Default for ModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let errors = TypeContext::with_max_errors(config.max_reported_errors);
        let overrides = config.parameters.clone();
        Self {
            config,
            symbols: SymbolTable::new(),
            variables: VariableRegistry::builder(),
            elements: ElementNameRegistry::builder(),
            constants: HashMap::new(),
            functions: HashMap::new(),
            overrides,
            no_variables: VariableRegistry::default(),
            no_elements: ElementNameRegistry::default(),
            errors,
        }
    }

    fn declare(&mut self, name: &str, location: Location) -> bool {
        match self.symbols.declare(name, location) {
            Ok(()) => true,
            Err(error) => {
                self.errors.add_error(error);
                false
            }
        }
    }

    fn compiler(&self) -> ExpressionCompiler<'_> {
        ExpressionCompiler::new(
            &self.no_variables,
            &self.no_elements,
            &self.constants,
            &self.functions,
        )
    }

    /// Checks `value` in constant scope and evaluates it.
    fn evaluate_declaration(&mut self, value: &Expression) -> Option<(Type, Value)> {
        let before = self.errors.error_count();
        let ty = TypeChecker::new(&self.symbols).check(value, &TypeScope::constant(), &mut self.errors);
        if self.errors.error_count() > before {
            return None;
        }
        match self.compiler().compile(value) {
            Ok(evaluator) => Some((ty, evaluate_constant(&evaluator))),
            Err(error) => {
                warn!("Declaration failed to compile: {}", error);
                None
            }
        }
    }

    pub fn declare_constant(&mut self, decl: &ConstantDecl) -> &mut Self {
        if !self.declare(&decl.name, decl.location) {
            return self;
        }
        if let Some((ty, value)) = self.evaluate_declaration(&decl.value) {
            if value.is_error() {
                warn!("Constant {} evaluates to an error", decl.name);
            }
            debug!("Declared constant {}: {} = {}", decl.name, ty, value);
            self.symbols.add_constant(&decl.name, ty);
            self.constants.insert(decl.name.clone(), value);
        }
        self
    }

    /// Parameters are real valued. The default is replaced by a value given beforehand
    /// with [`ModelBuilder::set_parameter`] or [`EngineConfig::parameters`], so every
    /// later declaration reads the same value.
    pub fn declare_parameter(&mut self, decl: &ParameterDecl) -> &mut Self {
        if !self.declare(&decl.name, decl.location) {
            return self;
        }
        if let Some((ty, value)) = self.evaluate_declaration(&decl.value) {
            if !ty.is_subtype_of(&Type::Real) {
                self.errors.add_error(TypeCheckError::type_mismatch(
                    Type::Real,
                    ty,
                    decl.value.location,
                ));
                return self;
            }
            let value = match self.overrides.remove(&decl.name) {
                Some(value) => {
                    debug!("Parameter {} overridden with {}", decl.name, value);
                    value
                }
                None => value.as_float(),
            };
            debug!("Declared parameter {} = {}", decl.name, value);
            self.symbols.add_constant(&decl.name, Type::Real);
            self.constants.insert(decl.name.clone(), Value::Real(value));
        }
        self
    }

    /// Overrides the default of a parameter that is declared later.
    ///
    /// Constants and functions capture parameter values when they are declared, so a
    /// name that is already declared cannot be overridden.
    pub fn set_parameter(&mut self, name: &str, value: f64) -> InternalResult<&mut Self> {
        if let Some(location) = self.symbols.declaration(name) {
            return Err(Error::Config(format!(
                "Cannot override {}: already declared at {}",
                name, location
            )));
        }
        self.overrides.insert(name.to_string(), value);
        Ok(self)
    }

    pub fn declare_record(&mut self, decl: &RecordDecl) -> &mut Self {
        if !self.declare(&decl.name, decl.location) {
            return self;
        }
        for error in self.symbols.add_record(&decl.name, &decl.fields) {
            self.errors.add_error(error);
        }
        self
    }

    pub fn declare_element(&mut self, decl: &ElementDecl) -> &mut Self {
        if !self.declare(&decl.name, decl.location) {
            return self;
        }
        let errors = self.symbols.elements_mut().add_element(decl);
        let failed = !errors.is_empty();
        for error in errors {
            self.errors.add_error(error);
        }
        if failed {
            return self;
        }
        if let Err(error) = self.elements.declare_element(&decl.name) {
            warn!("Element {} not registered: {}", decl.name, error);
            return self;
        }
        for attribute in decl
            .environment
            .iter()
            .chain(&decl.state)
            .chain(&decl.observations)
        {
            if let Err(RegistryError::ConflictingType {
                existing, requested, ..
            }) = self.variables.intern(&attribute.name, attribute.ty.clone())
            {
                self.errors.add_error(TypeCheckError::type_mismatch(
                    existing,
                    requested,
                    attribute.location,
                ));
            }
        }
        debug!("Declared element {}", decl.name);
        self
    }

    pub fn declare_group(&mut self, decl: &GroupDecl) -> &mut Self {
        if !self.declare(&decl.name, decl.location) {
            return self;
        }
        if let Err(error) =
            self.symbols
                .elements_mut()
                .add_group(&decl.name, &decl.members, decl.location)
        {
            self.errors.add_error(error);
            return self;
        }
        match self.elements.declare_group(&decl.name, &decl.members) {
            Ok(group) => debug!("Declared group {} with {} kinds", decl.name, group.len()),
            Err(error) => warn!("Group {} not registered: {}", decl.name, error),
        }
        self
    }

    /// Declares a function. The body sees its parameters, constants, and the functions
    /// declared before it.
    pub fn declare_function(&mut self, decl: &FunctionDecl) -> &mut Self {
        if !self.declare(&decl.name, decl.location) {
            return self;
        }
        let mut seen: HashMap<&str, Location> = HashMap::new();
        for parameter in &decl.parameters {
            if let Some(first) = seen.insert(parameter.name.as_str(), parameter.location) {
                self.errors.add_error(TypeCheckError::duplicate_identifier(
                    &parameter.name,
                    first,
                    parameter.location,
                ));
                return self;
            }
        }
        let scope = self
            .symbols
            .scope_for(ScopeKind::Function, None)
            .with_locals(decl.parameters.iter().map(|p| (p.name.as_str(), p.ty.clone())));
        let before = self.errors.error_count();
        let body_type = TypeChecker::new(&self.symbols).check(&decl.body, &scope, &mut self.errors);
        if !body_type.is_subtype_of(&decl.return_type) {
            self.errors.add_error(TypeCheckError::type_mismatch(
                decl.return_type.clone(),
                body_type,
                decl.body.location,
            ));
        }
        if self.errors.error_count() > before {
            return self;
        }
        match self.compiler().compile_function(decl) {
            Ok(compiled) => {
                self.symbols.add_function(FunctionSignature {
                    name: decl.name.clone(),
                    parameters: decl.parameters.clone(),
                    return_type: decl.return_type.clone(),
                });
                self.functions.insert(decl.name.clone(), compiled);
            }
            Err(error) => warn!("Function {} failed to compile: {}", decl.name, error),
        }
        self
    }

    /// Freezes the registries, or returns every error collected so far.
    pub fn build(mut self) -> InternalResult<Model> {
        if self.errors.has_errors() {
            let errors = self.errors.take_errors();
            debug!("Model rejected with {} errors", errors.len());
            return Err(Error::InvalidModel(errors));
        }
        if let Some(name) = self.overrides.keys().min() {
            return Err(Error::Config(format!("Unknown parameter: {}", name)));
        }
        let model = Model {
            config: self.config,
            symbols: self.symbols,
            variables: self.variables.build(),
            elements: self.elements.build(),
            constants: self.constants,
            functions: self.functions,
        };
        debug!(
            "Model built: {} constants, {} functions, {} variables",
            model.constants.len(),
            model.functions.len(),
            model.variables.len()
        );
        Ok(model)
    }
}

/// A loaded model. Immutable, and shareable across simulation threads.
#[derive(Debug, Clone)]
pub struct Model {
    config: EngineConfig,
    symbols: SymbolTable,
    variables: VariableRegistry,
    elements: ElementNameRegistry,
    constants: HashMap<String, Value>,
    functions: HashMap<String, CompiledFunction>,
}

impl Model {
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn variables(&self) -> &VariableRegistry {
        &self.variables
    }

    pub fn elements(&self) -> &ElementNameRegistry {
        &self.elements
    }

    pub fn constant(&self, name: &str) -> Option<&Value> {
        self.constants.get(name)
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn element(&self, name: &str) -> Option<ElementName> {
        self.elements.element(name)
    }

    pub fn scope(&self, kind: ScopeKind, element: Option<&str>) -> TypeScope {
        self.symbols.scope_for(kind, element)
    }

    /// Type of `expr` at a use site, or every error found in it.
    pub fn check(
        &self,
        expr: &Expression,
        kind: ScopeKind,
        element: Option<&str>,
    ) -> Result<Type, Vec<TypeCheckError>> {
        let mut ctx = TypeContext::with_max_errors(self.config.max_reported_errors);
        let ty = TypeChecker::new(&self.symbols).check(expr, &self.scope(kind, element), &mut ctx);
        if ctx.has_errors() {
            Err(ctx.take_errors())
        } else {
            Ok(ty)
        }
    }

    pub fn compile(&self, expr: &Expression) -> Result<Evaluator, CompileError> {
        ExpressionCompiler::new(
            &self.variables,
            &self.elements,
            &self.constants,
            &self.functions,
        )
        .compile(expr)
    }

    /// Checks `expr` at a use site, then compiles it.
    pub fn checked_compile(
        &self,
        expr: &Expression,
        kind: ScopeKind,
        element: Option<&str>,
    ) -> InternalResult<Evaluator> {
        let ty = self.check(expr, kind, element).map_err(Error::InvalidModel)?;
        let evaluator = self.compile(expr)?;
        debug!("Compiled {} expression of type {} at {}", kind, ty, expr.location);
        Ok(evaluator)
    }

    /// Builds a mapping from attribute names.
    pub fn mapping<'a, V: Into<Value>>(
        &self,
        values: impl IntoIterator<Item = (&'a str, V)>,
    ) -> InternalResult<VariableMapping> {
        let mut builder = VariableMapping::builder();
        for (name, value) in values {
            let variable = self
                .variables
                .get(name)
                .ok_or_else(|| Error::Compile(CompileError::UnknownSymbol(name.to_string())))?;
            builder = builder.set(variable, value);
        }
        Ok(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOperator, TypedName};
    use crate::type_checker::SymbolOracle;
    use pretty_assertions::assert_eq;

    fn constant(name: &str, value: Expression, line: usize) -> ConstantDecl {
        ConstantDecl {
            name: name.to_string(),
            value,
            location: Location::new(line, 1),
        }
    }

    #[test]
    fn test_constants_see_earlier_constants() {
        let mut builder = ModelBuilder::new();
        builder
            .declare_constant(&constant("a", Expression::integer(2), 1))
            .declare_constant(&constant(
                "b",
                Expression::binary(
                    BinaryOperator::Multiply,
                    Expression::reference("a"),
                    Expression::real(1.5),
                ),
                2,
            ));
        let model = builder.build().unwrap();
        assert_eq!(model.constant("b"), Some(&Value::Real(3.0)));
        assert_eq!(model.symbols().constant("a"), Some(Type::Integer));
    }

    fn rate() -> ParameterDecl {
        ParameterDecl {
            name: "rate".to_string(),
            value: Expression::integer(2),
            location: Location::new(1, 1),
        }
    }

    #[test]
    fn test_parameters_can_be_overridden() {
        let mut builder = ModelBuilder::new();
        builder.set_parameter("rate", 0.25).unwrap();
        builder.declare_parameter(&rate());
        assert!(matches!(
            builder.set_parameter("rate", 1.0),
            Err(Error::Config(_))
        ));
        let model = builder.build().unwrap();
        assert_eq!(model.constant("rate"), Some(&Value::Real(0.25)));
    }

    #[test]
    fn test_override_reaches_dependent_declarations() {
        let config = EngineConfig {
            parameters: HashMap::from([("rate".to_string(), 4.0)]),
            ..Default::default()
        };
        let mut builder = ModelBuilder::with_config(config);
        builder
            .declare_parameter(&rate())
            .declare_constant(&constant(
                "twice",
                Expression::binary(
                    BinaryOperator::Multiply,
                    Expression::reference("rate"),
                    Expression::integer(2),
                ),
                2,
            ))
            .declare_function(&FunctionDecl {
                name: "current".to_string(),
                parameters: Vec::new(),
                return_type: Type::Real,
                body: Expression::reference("rate"),
                location: Location::new(3, 1),
            });
        let model = builder.build().unwrap();
        assert_eq!(model.constant("rate"), Some(&Value::Real(4.0)));
        assert_eq!(model.constant("twice"), Some(&Value::Real(8.0)));
        let call = model.compile(&Expression::call("current", Vec::new())).unwrap();
        assert_eq!(evaluate_constant(&call), Value::Real(4.0));
    }

    #[test]
    fn test_override_of_undeclared_parameter_is_rejected() {
        let mut builder = ModelBuilder::new();
        builder.set_parameter("speed", 1.0).unwrap();
        builder.declare_parameter(&rate());
        assert!(matches!(builder.build(), Err(Error::Config(_))));
    }

    #[test]
    fn test_functions_cannot_recurse() {
        let mut builder = ModelBuilder::new();
        builder.declare_function(&FunctionDecl {
            name: "f".to_string(),
            parameters: vec![TypedName::new("n", Type::Integer)],
            return_type: Type::Integer,
            body: Expression::call("f", vec![Expression::reference("n")]).at(2, 5),
            location: Location::new(2, 1),
        });
        let error = builder.build().unwrap_err();
        assert_eq!(
            error.type_errors(),
            &[TypeCheckError::unknown_symbol("f", Location::new(2, 5))]
        );
    }

    #[test]
    fn test_errors_are_capped() {
        let config = EngineConfig {
            max_reported_errors: Some(1),
            ..Default::default()
        };
        let mut builder = ModelBuilder::with_config(config);
        builder
            .declare_constant(&constant("a", Expression::reference("x"), 1))
            .declare_constant(&constant("b", Expression::reference("y"), 2));
        let error = builder.build().unwrap_err();
        assert_eq!(error.type_errors().len(), 1);
    }
}
