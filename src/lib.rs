/*!
A declarative command-tree argument engine.

Applications build a [`Command`] tree at runtime — named options, positional
parameters, nested subcommands — then hand `main`'s argument vector to
[`Command::invoke`]. The engine classifies the tokens, binds raw values,
validates required options and group constraints, and dispatches to the
matching command node; the handles returned at declaration time read the
strongly-typed, validated values afterwards (or inside the command's
execution hook).

```no_run
use caucus::{Command, LoadedArguments, Tags};

let cmd = Command::new("greet");
let name = cmd.option::<String>(Tags::both('n', "name")).required();
let shout = cmd.flag(Tags::long("shout"));

let cmd = cmd.on_invoke({
    let (name, shout) = (name.clone(), shout.clone());
    move || {
        let mut greeting = format!("hello, {}", name.value()?);
        if shout.supplied() {
            greeting.make_ascii_uppercase();
        }
        println!("{greeting}");
        Ok(())
    }
});

if let Err(error) = LoadedArguments::from_env().invoke(&cmd) {
    eprintln!("error: {error}");
    std::process::exit(1);
}
```

Typed binding runs through two small traits: a [`Convert`][convert::Convert]
pipeline turns the raw string into the bound type (defaulting to
[`FromArg`][convert::FromArg], which any [`FromStr`][std::str::FromStr] type
can opt into), and a [`CheckSet`][check::CheckSet] validates the result.
Every user-input failure surfaces as the single [`ParseError`] kind;
declaration mistakes panic at the offending call instead.
*/

pub mod arguments;
pub mod catalog;
pub mod check;
pub mod command;
pub mod convert;
pub mod errors;
pub mod help;
pub mod option;
pub mod parameter;
pub mod printers;

mod value;

pub use arguments::LoadedArguments;
pub use command::Command;
pub use errors::{HookError, InvokeError, ParseError};
pub use option::{Combinator, Flag, Group, Tags, Valued};
pub use parameter::{ArrayParam, Param};
