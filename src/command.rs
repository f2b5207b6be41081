/*!
The command tree and its dispatch engine.

A [`Command`] owns an option registry, a parameter registry, and a keyed
collection of child commands. [`Command::invoke`] walks one argument slice:
options are scanned and validated first, then the positional boundary either
names a child command (which re-runs the same machine on the tokens after
it) or marks the start of this command's positional arguments.
*/

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};

use caucus_scan::{Arity, Scanner, Visitor};
use tracing::debug;

use crate::convert::{Convert, FromArg};
use crate::errors::{HookError, InvokeError, ParseError};
use crate::help::CommandSummary;
use crate::option::{Flag, Group, OptionRegistry, SharedOption, Tags, Valued};
use crate::parameter::{ArrayParam, Param, ParameterRegistry};

type SyncHook = Rc<dyn Fn() -> Result<(), HookError>>;
type AsyncHook = Rc<dyn Fn() -> Pin<Box<dyn Future<Output = Result<(), HookError>>>>>;

struct CommandNode {
    name: String,
    description: Option<String>,
    parent: Weak<RefCell<CommandNode>>,
    options: OptionRegistry,
    parameters: ParameterRegistry,
    children: CommandRegistry,
    hook: Option<SyncHook>,
    async_hook: Option<AsyncHook>,
}

/// Keyed, insertion-ordered collection of child commands.
struct CommandRegistry {
    order: Vec<String>,
    by_name: HashMap<String, Command>,
}

impl CommandRegistry {
    fn new() -> Self {
        Self {
            order: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    fn insert(&mut self, child: Command) {
        let name = child.name();
        if self.by_name.contains_key(&name) {
            panic!("duplicate subcommand {name:?}");
        }
        self.order.push(name.clone());
        self.by_name.insert(name, child);
    }

    fn get(&self, name: &str) -> Option<Command> {
        self.by_name.get(name).cloned()
    }

    fn remove(&mut self, name: &str) -> Option<Command> {
        let child = self.by_name.remove(name)?;
        self.order.retain(|entry| entry != name);
        Some(child)
    }
}

/// Where the tokens after option scanning go.
enum Dispatch {
    /// Descend into a child command, starting at this token index.
    Child(Command, usize),

    /// Bind this command's positional parameters from this token index.
    Bind(usize),
}

/**
A node in the command tree, declared at runtime.

`Command` is a cheap-clone handle: clones observe the same node, and the
handles returned by the declaration methods ([`flag`][Self::flag],
[`option`][Self::option], [`param`][Self::param], ...) stay valid for
reading typed values after an invocation.

The engine is single-threaded: handles are deliberately not `Send`, and one
tree must not be invoked re-entrantly. Use fresh trees (or serialize
invocations) when parsing several argument vectors.
*/
#[derive(Clone)]
pub struct Command {
    inner: Rc<RefCell<CommandNode>>,
}

impl Command {
    /// # Panics
    ///
    /// Panics if the name is empty.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        if name.is_empty() {
            panic!("command name must not be empty");
        }

        Self {
            inner: Rc::new(RefCell::new(CommandNode {
                name,
                description: None,
                parent: Weak::new(),
                options: OptionRegistry::new(),
                parameters: ParameterRegistry::new(),
                children: CommandRegistry::new(),
                hook: None,
                async_hook: None,
            })),
        }
    }

    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    pub fn describe(self, description: impl Into<String>) -> Self {
        self.inner.borrow_mut().description = Some(description.into());
        self
    }

    /// The command owning this one, if it has been added to a registry.
    pub fn parent(&self) -> Option<Command> {
        self.inner
            .borrow()
            .parent
            .upgrade()
            .map(|inner| Command { inner })
    }

    /// Declare a flag on this command.
    ///
    /// # Panics
    ///
    /// Panics if either tag collides with an existing option.
    pub fn flag(&self, tags: Tags) -> Flag {
        let flag = Flag::new(tags);
        self.inner.borrow_mut().options.add_named(flag.shared());
        flag
    }

    /// Declare a valued option on this command, converted through
    /// [`FromArg`].
    ///
    /// # Panics
    ///
    /// Panics if either tag collides with an existing option.
    pub fn option<T>(&self, tags: Tags) -> Valued<T>
    where
        T: FromArg + Clone + 'static,
    {
        let option = Valued::new(tags);
        self.inner.borrow_mut().options.add_named(option.shared());
        option
    }

    /// Declare a valued option with a custom conversion pipeline.
    ///
    /// # Panics
    ///
    /// Panics if either tag collides with an existing option.
    pub fn option_with<T>(
        &self,
        tags: Tags,
        converter: impl Convert<Input = String, Output = T> + 'static,
    ) -> Valued<T>
    where
        T: Clone + 'static,
    {
        let option = Valued::with_converter(tags, converter);
        self.inner.borrow_mut().options.add_named(option.shared());
        option
    }

    /// Attach a populated option group.
    ///
    /// # Panics
    ///
    /// Panics if any child's tag collides with an existing option.
    pub fn add_group(&self, group: Group) {
        self.inner.borrow_mut().options.add_group(group);
    }

    /// Declare a positional parameter binding exactly one token.
    ///
    /// # Panics
    ///
    /// Panics if the name is empty or taken, or if it would follow the
    /// array parameter.
    pub fn param<T>(&self, name: &str) -> Param<T>
    where
        T: FromArg + Clone + 'static,
    {
        self.inner.borrow_mut().parameters.add_single(name)
    }

    /// Declare a positional parameter with a custom conversion pipeline.
    ///
    /// # Panics
    ///
    /// Same conditions as [`param`][Self::param].
    pub fn param_with<T>(
        &self,
        name: &str,
        converter: impl Convert<Input = String, Output = T> + 'static,
    ) -> Param<T>
    where
        T: Clone + 'static,
    {
        self.inner
            .borrow_mut()
            .parameters
            .add_single_with(name, converter)
    }

    /// Declare the trailing array parameter, binding all leftover tokens.
    ///
    /// # Panics
    ///
    /// Panics if the name is empty or taken, or if an array parameter
    /// already exists.
    pub fn array_param<T>(&self, name: &str) -> ArrayParam<T>
    where
        T: FromArg + Clone + 'static,
    {
        self.inner.borrow_mut().parameters.add_array(name)
    }

    /// Let binding synthesize string-typed parameters for surplus
    /// positional tokens instead of rejecting them; read them back with
    /// [`extra_args`][Self::extra_args].
    pub fn accept_extra_args(self) -> Self {
        self.inner.borrow_mut().parameters.set_auto_create(true);
        self
    }

    /// Tokens bound to synthesized overflow parameters by the last
    /// invocation.
    pub fn extra_args(&self) -> Vec<String> {
        self.inner.borrow().parameters.overflow()
    }

    /// Create a child command and add it to this command's registry.
    ///
    /// # Panics
    ///
    /// Panics if the name is empty or already names a child.
    pub fn subcommand(&self, name: impl Into<String>) -> Command {
        let child = Command::new(name);
        self.add_command(child.clone());
        child
    }

    /// Add an existing command as a child. Ownership is exclusive: the
    /// child must first be removed from any previous parent.
    ///
    /// # Panics
    ///
    /// Panics if the child already has a parent, if its name is taken, or
    /// if adding it would make a command its own ancestor.
    pub fn add_command(&self, child: Command) {
        if child.parent().is_some() {
            panic!("command {:?} already has a parent", child.name());
        }

        // a command cannot own itself or an ancestor
        let mut ancestor = Some(self.clone());
        while let Some(current) = ancestor {
            if Rc::ptr_eq(&current.inner, &child.inner) {
                panic!("command {:?} would become its own ancestor", child.name());
            }
            ancestor = current.parent();
        }

        child.inner.borrow_mut().parent = Rc::downgrade(&self.inner);
        self.inner.borrow_mut().children.insert(child);
    }

    /// Remove a child by name, clearing its parent back-reference.
    pub fn remove_command(&self, name: &str) -> Option<Command> {
        let child = self.inner.borrow_mut().children.remove(name)?;
        child.inner.borrow_mut().parent = Weak::new();
        Some(child)
    }

    /// Install the synchronous execution hook, run on every invocation that
    /// reaches this command's positional binding.
    pub fn on_invoke(self, hook: impl Fn() -> Result<(), HookError> + 'static) -> Self {
        self.inner.borrow_mut().hook = Some(Rc::new(hook));
        self
    }

    /// Install the asynchronous execution hook, awaited by
    /// [`invoke_async`][Self::invoke_async] after the synchronous hook.
    pub fn on_invoke_async<F, Fut>(self, hook: F) -> Self
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = Result<(), HookError>> + 'static,
    {
        self.inner.borrow_mut().async_hook = Some(Rc::new(move || {
            let future: Pin<Box<dyn Future<Output = Result<(), HookError>>>> = Box::pin(hook());
            future
        }));
        self
    }

    /// Snapshot of this command's declared surface for help rendering.
    pub fn summary(&self) -> CommandSummary {
        let node = self.inner.borrow();
        CommandSummary {
            name: node.name.clone(),
            description: node.description.clone(),
            options: node.options.summaries(),
            parameters: node.parameters.summaries(),
            subcommands: node
                .children
                .order
                .iter()
                .filter_map(|name| node.children.by_name.get(name))
                .map(|child| {
                    let child = child.inner.borrow();
                    (child.name.clone(), child.description.clone())
                })
                .collect(),
        }
    }

    /// Scan and validate this command's options, then decide where the
    /// remaining tokens go. No hook runs and nothing binds once an error is
    /// raised here.
    fn dispatch(&self, args: &[String]) -> Result<Dispatch, ParseError> {
        let node = self.inner.borrow();

        // invocations are independent: start from nothing supplied
        node.options.reset_all();

        let boundary = {
            let mut visitor = RegistryVisitor {
                options: &node.options,
                pending: None,
            };
            Scanner::new(args).scan(&mut visitor)?
        };
        node.options.validate()?;

        debug!(
            command = %node.name,
            boundary = ?boundary,
            "options scanned"
        );

        Ok(match boundary {
            Some(at) => match node.children.get(&args[at]) {
                Some(child) => Dispatch::Child(child, at + 1),
                None => Dispatch::Bind(at),
            },
            None => Dispatch::Bind(args.len()),
        })
    }

    fn bind_and_run_sync(&self, rest: &[String]) -> Result<(), InvokeError> {
        self.inner.borrow_mut().parameters.bind(rest)?;

        let hook = self.inner.borrow().hook.clone();
        if let Some(hook) = hook {
            hook().map_err(InvokeError::from_hook)?;
        }
        Ok(())
    }

    /**
    Parse one argument slice against this command and run it.

    The slice should exclude the program name. This command's options are
    fully resolved and validated first; if the first positional token names
    a child command, that child re-runs the same machine on the tokens after
    it (options are scoped per level). Otherwise the remaining tokens bind
    to this command's positional parameters and the synchronous execution
    hook runs. An async hook installed with
    [`on_invoke_async`][Self::on_invoke_async] is ignored here; use
    [`invoke_async`][Self::invoke_async] to await it.

    On error nothing more is processed: no hook runs for this command or
    any descendant.
    */
    pub fn invoke(&self, args: &[String]) -> Result<(), InvokeError> {
        match self.dispatch(args)? {
            Dispatch::Child(child, next) => {
                debug!(child = %child.name(), "descending into subcommand");
                child.invoke(&args[next..])
            }
            Dispatch::Bind(at) => self.bind_and_run_sync(&args[at..]),
        }
    }

    /// [`invoke`][Self::invoke], plus awaiting the async execution hook
    /// after the synchronous one on whichever command the dispatch lands.
    pub async fn invoke_async(&self, args: &[String]) -> Result<(), InvokeError> {
        self.invoke_boxed(args).await
    }

    // async recursion needs the indirection
    fn invoke_boxed<'a>(
        &'a self,
        args: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<(), InvokeError>> + 'a>> {
        Box::pin(async move {
            match self.dispatch(args)? {
                Dispatch::Child(child, next) => {
                    debug!(child = %child.name(), "descending into subcommand");
                    let rest = &args[next..];
                    child.invoke_boxed(rest).await
                }
                Dispatch::Bind(at) => {
                    self.bind_and_run_sync(&args[at..])?;

                    let async_hook = self.inner.borrow().async_hook.clone();
                    if let Some(hook) = async_hook {
                        hook().await.map_err(InvokeError::from_hook)?;
                    }
                    Ok(())
                }
            }
        })
    }
}

/// Bridges the scanner to one command's option registry: resolves names,
/// answers arity, and stores raw values.
struct RegistryVisitor<'r> {
    options: &'r OptionRegistry,
    pending: Option<SharedOption>,
}

impl<'r, 'arg> Visitor<'arg> for RegistryVisitor<'r> {
    type Error = ParseError;

    fn long(&mut self, name: &'arg str) -> Result<Arity, ParseError> {
        let option = self
            .options
            .by_long(name)
            .ok_or_else(|| ParseError::UnknownLong(name.to_owned()))?;

        let valued = option.borrow().is_valued();
        if valued {
            self.pending = Some(option);
            Ok(Arity::Valued)
        } else {
            OptionRegistry::apply(&option, "")?;
            Ok(Arity::Flag)
        }
    }

    fn long_with_value(&mut self, name: &'arg str, value: &'arg str) -> Result<(), ParseError> {
        let option = self
            .options
            .by_long(name)
            .ok_or_else(|| ParseError::UnknownLong(name.to_owned()))?;

        let valued = option.borrow().is_valued();
        if !valued {
            let tags = option.borrow().tags().to_string();
            return Err(ParseError::UnexpectedValue(tags, value.to_owned()));
        }
        OptionRegistry::apply(&option, value)
    }

    fn short(&mut self, tag: char) -> Result<Arity, ParseError> {
        let option = self
            .options
            .by_short(tag)
            .ok_or(ParseError::UnknownShort(tag))?;

        let valued = option.borrow().is_valued();
        if valued {
            self.pending = Some(option);
            Ok(Arity::Valued)
        } else {
            OptionRegistry::apply(&option, "")?;
            Ok(Arity::Flag)
        }
    }

    fn value(&mut self, raw: &'arg str) -> Result<(), ParseError> {
        let option = self
            .pending
            .take()
            .expect("scanner protocol: a value is only delivered after a Valued response");
        OptionRegistry::apply(&option, raw)
    }

    fn missing_value(&mut self) -> ParseError {
        let name = self
            .pending
            .take()
            .map(|option| option.borrow().tags().to_string())
            .unwrap_or_default();
        ParseError::MissingValue(name)
    }
}
