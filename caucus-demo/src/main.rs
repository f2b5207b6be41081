//! A small stash CLI exercising the whole engine: nested subcommands,
//! flags and valued options, an exclusive format group, checked positional
//! parameters, and both execution hook kinds.

use std::io::{self, Write as _};
use std::path::PathBuf;
use std::process;

use caucus::catalog::{self, KeyValue};
use caucus::{Combinator, Command, Group, HookError, InvokeError, LoadedArguments, Tags, printers};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn build_tree() -> Command {
    let stash = Command::new("stash").describe("Keep notes and files in a local stash.");
    let verbose = stash
        .flag(Tags::both('v', "verbose"))
        .multi()
        .describe("more logging per repeat");
    let config = stash
        .option::<PathBuf>(Tags::both('c', "config"))
        .describe("alternate config file");

    let add = stash.subcommand("add").describe("Stash a named entry.");
    let tags = add
        .option::<String>(Tags::both('t', "tag"))
        .multi()
        .describe("attach a tag");
    let defines = add
        .option_with::<(String, String)>(Tags::both('d', "define"), KeyValue)
        .multi()
        .describe("attach a key=value property");
    let name = add
        .param::<String>("name")
        .required()
        .check(catalog::matches("^[a-z][a-z0-9-]*$"))
        .describe("entry name");
    let files = add
        .array_param::<PathBuf>("files")
        .check(catalog::path_exists())
        .describe("files to stash alongside");

    add.on_invoke({
        let (verbose, config) = (verbose.clone(), config.clone());
        let (tags, defines, name, files) = (tags.clone(), defines.clone(), name.clone(), files.clone());
        move || {
            let name = name.value()?;
            if verbose.count() > 0
                && let Some(config) = config.get()?
            {
                info!(config = %config.display(), "using alternate config");
            }

            println!("stashed {name}");
            for tag in tags.values()? {
                println!("  tag: {tag}");
            }
            for (key, value) in defines.values()? {
                println!("  {key} = {value}");
            }
            for file in files.values()? {
                println!("  file: {}", file.display());
            }
            Ok(())
        }
    });

    let list = stash.subcommand("list").describe("Show stashed entries.");
    let mut format = Group::new(Combinator::One).label("format");
    let json = format.flag(Tags::long("json")).describe("machine readable");
    format.flag(Tags::long("plain")).describe("one name per line");
    list.add_group(format);
    let limit = list
        .option::<usize>(Tags::both('n', "limit"))
        .default_value(20)
        .check(catalog::range(1..=100))
        .describe("how many entries to show");

    list.on_invoke_async({
        let (json, limit) = (json.clone(), limit.clone());
        move || {
            let (json, limit) = (json.clone(), limit.clone());
            async move {
                // a real implementation would await storage here
                tokio::task::yield_now().await;

                if json.supplied() {
                    println!("[]");
                } else {
                    for index in 0..limit.value()?.min(3) {
                        println!("entry-{index}");
                    }
                }
                Ok::<(), HookError>(())
            }
        }
    });

    stash
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let stash = build_tree();

    // `help` renders a snapshot taken once the whole surface is declared;
    // a bare `stash` renders the same thing
    let help = stash.subcommand("help").describe("Show this message.");
    let summary = stash.summary();
    let root_summary = summary.clone();
    help.on_invoke(move || {
        printers::write_help(&mut io::stdout().lock(), &summary)?;
        Ok(())
    });
    stash.clone().on_invoke(move || {
        printers::write_help(&mut io::stdout().lock(), &root_summary)?;
        Ok(())
    });

    let arguments = LoadedArguments::from_env();
    if let Err(error) = stash.invoke_async(arguments.args()).await {
        match error {
            InvokeError::Parse(error) => {
                let mut stderr = io::stderr().lock();
                printers::write_parse_error(&mut stderr, &error)?;
                writeln!(stderr, "try `stash help`")?;
                process::exit(2);
            }
            InvokeError::Handler(error) => return Err(anyhow::anyhow!(error)),
        }
    }

    Ok(())
}
