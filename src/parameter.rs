/*!
The positional-parameter model: single-token binders, the trailing array
binder, and the per-command registry that assigns leftover tokens to them.

Parameters bind by position, in declaration order. The registry enforces at
declaration time that at most one array parameter exists and that nothing
follows it; binding happens once per invocation, after option scanning and
subcommand dispatch have claimed their tokens.
*/

use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;

use crate::check::{Check, CheckSet};
use crate::convert::{BoxConvert, Convert, FromArg, Standard};
use crate::errors::ParseError;
use crate::help::ParameterSummary;
use crate::value::ValueCell;

/// Untyped binding and iteration surface shared by every parameter.
pub(crate) trait ParameterNode {
    fn name(&self) -> &str;
    fn description(&self) -> Option<&str>;
    fn index(&self) -> usize;
    fn required(&self) -> bool;
    fn is_array(&self) -> bool;
    fn supplied(&self) -> bool;
    fn raw_values(&self) -> Vec<String>;

    /// Clear bound values ahead of a re-bind.
    fn reset(&mut self);

    /// Bind one token. Scalars replace; arrays append.
    fn push_raw(&mut self, raw: &str);
}

pub(crate) type SharedParameter = Rc<RefCell<dyn ParameterNode>>;

struct SingleNode<T> {
    name: String,
    description: Option<String>,
    index: usize,
    required: bool,
    raw: Option<String>,
    converter: BoxConvert<T>,
    checks: CheckSet<T>,
    default: Option<T>,
}

impl<T: Clone> SingleNode<T> {
    fn resolve(&self, raw: &str) -> Result<T, ParseError> {
        self.converter
            .convert(raw.to_owned())
            .and_then(|value| self.checks.check(&value).map(|()| value))
            .map_err(|reason| ParseError::Invalid {
                name: format!("<{}>", self.name),
                raw: raw.to_owned(),
                reason: reason.to_string(),
            })
    }

    fn get(&self) -> Result<Option<T>, ParseError> {
        match &self.raw {
            Some(raw) => self.resolve(raw).map(Some),
            None if self.required => Err(ParseError::MissingParameter(self.name.clone())),
            None => Ok(self.default.clone()),
        }
    }
}

impl<T> ParameterNode for SingleNode<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn index(&self) -> usize {
        self.index
    }

    fn required(&self) -> bool {
        self.required
    }

    fn is_array(&self) -> bool {
        false
    }

    fn supplied(&self) -> bool {
        self.raw.is_some()
    }

    fn raw_values(&self) -> Vec<String> {
        self.raw.clone().into_iter().collect()
    }

    fn reset(&mut self) {
        self.raw = None;
    }

    fn push_raw(&mut self, raw: &str) {
        self.raw = Some(raw.to_owned());
    }
}

struct ArrayNode<T> {
    name: String,
    description: Option<String>,
    index: usize,
    required: bool,
    raws: Vec<String>,
    converter: BoxConvert<T>,
    checks: CheckSet<T>,
    cache: ValueCell<Vec<T>>,
}

impl<T: Clone> ArrayNode<T> {
    fn resolve_one(&self, raw: &str) -> Result<T, ParseError> {
        self.converter
            .convert(raw.to_owned())
            .and_then(|value| self.checks.check(&value).map(|()| value))
            .map_err(|reason| ParseError::Invalid {
                name: format!("<{}>", self.name),
                raw: raw.to_owned(),
                reason: reason.to_string(),
            })
    }

    /// Resolved once per binding, cached until the raw values change. A
    /// required array with nothing bound raises rather than resolving
    /// empty.
    fn values(&mut self) -> Result<Vec<T>, ParseError> {
        if self.raws.is_empty() && self.required {
            return Err(ParseError::MissingParameter(self.name.clone()));
        }
        if let Some(cached) = self.cache.resolved() {
            return Ok(cached.clone());
        }

        let resolved = self
            .raws
            .iter()
            .map(|raw| self.resolve_one(raw))
            .collect::<Result<Vec<_>, _>>()?;
        self.cache.store(resolved.clone());
        Ok(resolved)
    }
}

impl<T> ParameterNode for ArrayNode<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn index(&self) -> usize {
        self.index
    }

    fn required(&self) -> bool {
        self.required
    }

    fn is_array(&self) -> bool {
        true
    }

    fn supplied(&self) -> bool {
        !self.raws.is_empty()
    }

    fn raw_values(&self) -> Vec<String> {
        self.raws.clone()
    }

    fn reset(&mut self) {
        self.raws.clear();
        self.cache.reset();
    }

    fn push_raw(&mut self, raw: &str) {
        self.raws.push(raw.to_owned());
        self.cache.invalidate();
    }
}

/**
Handle to a declared positional parameter binding exactly one token.

Cloning is cheap and every clone observes the same underlying parameter.
*/
pub struct Param<T> {
    node: Rc<RefCell<SingleNode<T>>>,
}

impl<T> Clone for Param<T> {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
        }
    }
}

impl<T: FromArg + Clone + 'static> Param<T> {
    pub(crate) fn new(name: String, index: usize) -> Self {
        Self::with_converter(name, index, Standard::new())
    }
}

impl<T: Clone + 'static> Param<T> {
    pub(crate) fn with_converter(
        name: String,
        index: usize,
        converter: impl Convert<Input = String, Output = T> + 'static,
    ) -> Self {
        Self {
            node: Rc::new(RefCell::new(SingleNode {
                name,
                description: None,
                index,
                required: false,
                raw: None,
                converter: Box::new(converter),
                checks: CheckSet::new(),
                default: None,
            })),
        }
    }

    pub(crate) fn shared(&self) -> SharedParameter {
        let shared: SharedParameter = self.node.clone();
        shared
    }

    /// Mark the parameter required: binding fails when no token reaches it.
    pub fn required(self) -> Self {
        self.node.borrow_mut().required = true;
        self
    }

    pub fn describe(self, description: impl Into<String>) -> Self {
        self.node.borrow_mut().description = Some(description.into());
        self
    }

    /// The value reads fall back to when no token was bound.
    pub fn default_value(self, value: T) -> Self {
        self.node.borrow_mut().default = Some(value);
        self
    }

    /// Append one validation check.
    pub fn check(self, check: impl Check<T> + 'static) -> Self {
        {
            let mut node = self.node.borrow_mut();
            let checks = std::mem::take(&mut node.checks);
            node.checks = checks.with(check);
        }
        self
    }

    /// Replace the conversion pipeline for this parameter.
    pub fn convert_with(
        self,
        converter: impl Convert<Input = String, Output = T> + 'static,
    ) -> Self {
        self.node.borrow_mut().converter = Box::new(converter);
        self
    }

    pub fn supplied(&self) -> bool {
        self.node.borrow().supplied()
    }

    /// The typed value, or `None` when nothing was bound and there is no
    /// default. Resolved fresh on every call.
    pub fn get(&self) -> Result<Option<T>, ParseError> {
        self.node.borrow().get()
    }

    /// The typed value; an unbound parameter with no default is an error
    /// naming the parameter.
    pub fn value(&self) -> Result<T, ParseError> {
        match self.node.borrow().get()? {
            Some(value) => Ok(value),
            None => Err(ParseError::MissingParameter(
                self.node.borrow().name.clone(),
            )),
        }
    }
}

/**
Handle to the trailing array parameter, binding every leftover token.

The converted array is resolved lazily on first read and cached; re-binding
invalidates the cache. Cloning is cheap and every clone observes the same
underlying parameter.
*/
pub struct ArrayParam<T> {
    node: Rc<RefCell<ArrayNode<T>>>,
}

impl<T> Clone for ArrayParam<T> {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
        }
    }
}

impl<T: FromArg + Clone + 'static> ArrayParam<T> {
    pub(crate) fn new(name: String, index: usize) -> Self {
        Self::with_converter(name, index, Standard::new())
    }
}

impl<T: Clone + 'static> ArrayParam<T> {
    pub(crate) fn with_converter(
        name: String,
        index: usize,
        converter: impl Convert<Input = String, Output = T> + 'static,
    ) -> Self {
        Self {
            node: Rc::new(RefCell::new(ArrayNode {
                name,
                description: None,
                index,
                required: false,
                raws: Vec::new(),
                converter: Box::new(converter),
                checks: CheckSet::new(),
                cache: ValueCell::Unset,
            })),
        }
    }

    pub(crate) fn shared(&self) -> SharedParameter {
        let shared: SharedParameter = self.node.clone();
        shared
    }

    /// Mark the array required: binding fails when it receives zero tokens.
    pub fn required(self) -> Self {
        self.node.borrow_mut().required = true;
        self
    }

    pub fn describe(self, description: impl Into<String>) -> Self {
        self.node.borrow_mut().description = Some(description.into());
        self
    }

    /// Append one validation check, applied to each element.
    pub fn check(self, check: impl Check<T> + 'static) -> Self {
        {
            let mut node = self.node.borrow_mut();
            let checks = std::mem::take(&mut node.checks);
            node.checks = checks.with(check);
        }
        self
    }

    /// Replace the conversion pipeline for this parameter.
    pub fn convert_with(
        self,
        converter: impl Convert<Input = String, Output = T> + 'static,
    ) -> Self {
        self.node.borrow_mut().converter = Box::new(converter);
        self
    }

    pub fn supplied(&self) -> bool {
        self.node.borrow().supplied()
    }

    /// Every bound token, converted and checked.
    pub fn values(&self) -> Result<Vec<T>, ParseError> {
        self.node.borrow_mut().values()
    }
}

/// Ordered collection of one command's positional parameters.
pub(crate) struct ParameterRegistry {
    params: Vec<SharedParameter>,
    /// How many parameters were declared by the application; anything past
    /// this index was synthesized by overflow binding.
    declared: usize,
    auto_create: bool,
}

impl ParameterRegistry {
    pub(crate) fn new() -> Self {
        Self {
            params: Vec::new(),
            declared: 0,
            auto_create: false,
        }
    }

    pub(crate) fn set_auto_create(&mut self, on: bool) {
        self.auto_create = on;
    }

    /// # Panics
    ///
    /// Panics when the name is empty or already taken, or when any
    /// parameter is declared after the trailing array parameter; these are
    /// declaration bugs, caught here rather than at parse time.
    fn check_placement(&self, name: &str, is_array: bool) {
        if name.is_empty() {
            panic!("parameter name must not be empty");
        }
        if self
            .params
            .iter()
            .any(|param| param.borrow().name() == name)
        {
            panic!("duplicate parameter <{name}>");
        }
        if let Some(last) = self.params.last()
            && last.borrow().is_array()
        {
            match is_array {
                true => panic!("a command may declare at most one array parameter"),
                false => panic!("no parameter may follow the array parameter"),
            }
        }
    }

    pub(crate) fn add_single<T: FromArg + Clone + 'static>(&mut self, name: &str) -> Param<T> {
        self.check_placement(name, false);
        let param = Param::new(name.to_owned(), self.params.len());
        self.params.push(param.shared());
        self.declared = self.params.len();
        param
    }

    pub(crate) fn add_single_with<T: Clone + 'static>(
        &mut self,
        name: &str,
        converter: impl Convert<Input = String, Output = T> + 'static,
    ) -> Param<T> {
        self.check_placement(name, false);
        let param = Param::with_converter(name.to_owned(), self.params.len(), converter);
        self.params.push(param.shared());
        self.declared = self.params.len();
        param
    }

    pub(crate) fn add_array<T: FromArg + Clone + 'static>(&mut self, name: &str) -> ArrayParam<T> {
        self.check_placement(name, true);
        let param = ArrayParam::new(name.to_owned(), self.params.len());
        self.params.push(param.shared());
        self.declared = self.params.len();
        param
    }

    /**
    Bind leftover positional tokens.

    Scalars consume one token each in declaration order; the trailing array,
    if any, consumes everything left (zero tokens is only an error when the
    array is required). Surplus tokens with no array parameter synthesize
    string-typed overflow parameters when auto-create mode is on, and are a
    parse error otherwise. Re-binding resets previous values and discards
    previously synthesized parameters.
    */
    pub(crate) fn bind(&mut self, tokens: &[String]) -> Result<(), ParseError> {
        trace!(tokens = tokens.len(), "binding positional arguments");

        self.params.truncate(self.declared);
        for param in &self.params {
            param.borrow_mut().reset();
        }

        let mut cursor = 0;
        for param in &self.params {
            let mut node = param.borrow_mut();
            if node.is_array() {
                for token in &tokens[cursor..] {
                    node.push_raw(token);
                }
                cursor = tokens.len();
                if node.required() && !node.supplied() {
                    return Err(ParseError::MissingParameter(node.name().to_owned()));
                }
            } else {
                match tokens.get(cursor) {
                    Some(token) => {
                        node.push_raw(token);
                        cursor += 1;
                    }
                    None if node.required() => {
                        return Err(ParseError::MissingParameter(node.name().to_owned()));
                    }
                    None => {}
                }
            }
        }

        for token in &tokens[cursor..] {
            if !self.auto_create {
                return Err(ParseError::UnexpectedArgument(token.clone()));
            }

            let index = self.params.len();
            let param: Param<String> = Param::new(format!("arg{index}"), index);
            param.node.borrow_mut().push_raw(token);
            self.params.push(param.shared());
        }

        Ok(())
    }

    /// Raw values bound to synthesized overflow parameters, in order.
    pub(crate) fn overflow(&self) -> Vec<String> {
        self.params[self.declared..]
            .iter()
            .flat_map(|param| param.borrow().raw_values())
            .collect()
    }

    pub(crate) fn summaries(&self) -> Vec<ParameterSummary> {
        self.params
            .iter()
            .map(|param| {
                let node = param.borrow();
                ParameterSummary {
                    name: node.name().to_owned(),
                    description: node.description().map(str::to_owned),
                    index: node.index(),
                    required: node.required(),
                    is_array: node.is_array(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::ParameterRegistry;
    use crate::errors::ParseError;

    fn tokens(list: &[&str]) -> Vec<String> {
        list.iter().map(|token| (*token).to_owned()).collect()
    }

    #[test]
    #[should_panic(expected = "at most one array parameter")]
    fn second_array_parameter_is_a_configuration_error() {
        let mut registry = ParameterRegistry::new();
        registry.add_array::<String>("files");
        registry.add_array::<String>("more");
    }

    #[test]
    #[should_panic(expected = "follow the array parameter")]
    fn scalar_after_array_is_a_configuration_error() {
        let mut registry = ParameterRegistry::new();
        registry.add_array::<String>("files");
        registry.add_single::<String>("output");
    }

    #[test]
    #[should_panic(expected = "duplicate parameter <input>")]
    fn duplicate_name_is_a_configuration_error() {
        let mut registry = ParameterRegistry::new();
        registry.add_single::<String>("input");
        registry.add_single::<String>("input");
    }

    #[test]
    fn scalar_then_array_split() {
        let mut registry = ParameterRegistry::new();
        let input = registry.add_single::<String>("input").required();
        let rest = registry.add_array::<String>("rest");

        registry.bind(&tokens(&["x"])).unwrap();
        assert_eq!(input.value().unwrap(), "x");
        assert!(!rest.supplied());
        assert_eq!(rest.values().unwrap(), Vec::<String>::new());

        registry.bind(&tokens(&["x", "y", "z"])).unwrap();
        assert_eq!(rest.values().unwrap(), ["y", "z"]);
    }

    #[test]
    fn rebinding_invalidates_the_cached_array() {
        let mut registry = ParameterRegistry::new();
        let rest = registry.add_array::<u32>("nums");

        registry.bind(&tokens(&["1", "2"])).unwrap();
        assert_eq!(rest.values().unwrap(), [1, 2]);

        registry.bind(&tokens(&["7"])).unwrap();
        assert_eq!(rest.values().unwrap(), [7]);
    }

    #[test]
    fn missing_required_scalar_is_reported_by_name() {
        let mut registry = ParameterRegistry::new();
        registry.add_single::<String>("source").required();
        registry.add_single::<String>("dest").required();

        let error = registry.bind(&tokens(&["only-one"])).unwrap_err();
        assert!(matches!(error, ParseError::MissingParameter(name) if name == "dest"));
    }

    #[test]
    fn required_array_rejects_zero_tokens() {
        let mut registry = ParameterRegistry::new();
        registry.add_array::<String>("files").required();

        let error = registry.bind(&[]).unwrap_err();
        assert!(matches!(error, ParseError::MissingParameter(name) if name == "files"));
    }

    #[test]
    fn surplus_without_auto_create_is_a_parse_error() {
        let mut registry = ParameterRegistry::new();
        registry.add_single::<String>("input");

        let error = registry.bind(&tokens(&["a", "b"])).unwrap_err();
        assert!(matches!(error, ParseError::UnexpectedArgument(token) if token == "b"));
    }

    #[test]
    fn auto_create_synthesizes_string_parameters() {
        let mut registry = ParameterRegistry::new();
        registry.add_single::<String>("input");
        registry.set_auto_create(true);

        registry.bind(&tokens(&["a", "b", "c"])).unwrap();
        assert_eq!(registry.overflow(), ["b", "c"]);

        // a re-bind discards the synthesized parameters before creating
        // new ones
        registry.bind(&tokens(&["a", "d"])).unwrap();
        assert_eq!(registry.overflow(), ["d"]);
    }

    #[test]
    fn optional_scalar_left_unbound_reads_as_none() {
        let mut registry = ParameterRegistry::new();
        let input = registry.add_single::<String>("input");

        registry.bind(&[]).unwrap();
        assert!(!input.supplied());
        assert_eq!(input.get().unwrap(), None);
    }
}
