use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};

use crate::filters::{FilterAxis, FilterValues, Polarity};

pub const DB_PATH_ENV: &str = "COURSE_FILTER_DB";
const DEFAULT_DB_FILE: &str = "course-filter.sqlite3";

pub const HELP: &str = include_str!("cli_help.txt");

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run one response body from stdin through the interceptor to stdout.
    Filter {
        url: String,
        request_id: Option<String>,
    },
    /// Cycle one option through unset, included and excluded.
    Toggle { axis: FilterAxis, option: String },
    /// Replace one filter set outright.
    Set {
        axis: FilterAxis,
        polarity: Polarity,
        values: FilterValues,
    },
    /// Clear every filter set.
    Reset,
    Show,
    /// Signal that a request finished loading; notifies the page for the shell.
    Complete { url: String },
    Config { write: Option<PathBuf> },
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub db_path: PathBuf,
    pub config_path: Option<PathBuf>,
    pub command: Command,
}

pub fn parse_args<I>(args: I) -> Result<CliArgs>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut db_path = None;
    let mut config_path = None;

    let name = loop {
        let Some(arg) = args.next() else {
            return Ok(CliArgs {
                db_path: resolve_db_path(db_path),
                config_path,
                command: Command::Help,
            });
        };
        match arg.as_str() {
            "--db" => db_path = Some(PathBuf::from(value_for(&mut args, "--db")?)),
            "--config" => config_path = Some(PathBuf::from(value_for(&mut args, "--config")?)),
            "-h" | "--help" => {
                return Ok(CliArgs {
                    db_path: resolve_db_path(db_path),
                    config_path,
                    command: Command::Help,
                })
            }
            flag if flag.starts_with('-') => bail!("Unknown option: {flag}"),
            _ => break arg,
        }
    };

    let command = match name.as_str() {
        "filter" => {
            let mut url = None;
            let mut request_id = None;
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--url" => url = Some(value_for(&mut args, "--url")?),
                    "--request-id" => request_id = Some(value_for(&mut args, "--request-id")?),
                    other => bail!("Unknown argument for filter: {other}"),
                }
            }
            Command::Filter {
                url: url.ok_or_else(|| anyhow!("filter requires --url"))?,
                request_id,
            }
        }
        "toggle" => {
            let axis = parse_axis(args.next())?;
            let option = args
                .next()
                .ok_or_else(|| anyhow!("toggle requires an option"))?;
            no_more(&mut args, "toggle")?;
            Command::Toggle { axis, option }
        }
        "set" => {
            let axis = parse_axis(args.next())?;
            let polarity = match args.next().as_deref() {
                Some("positive" | "include") => Polarity::Positive,
                Some("negative" | "exclude") => Polarity::Negative,
                Some(other) => bail!("Unknown polarity: {other}"),
                None => bail!("set requires a polarity (positive or negative)"),
            };
            let values = FilterValues::new(
                args.flat_map(|arg| {
                    arg.split(',')
                        .map(str::trim)
                        .filter(|value| !value.is_empty())
                        .map(str::to_string)
                        .collect::<Vec<_>>()
                }),
            );
            Command::Set {
                axis,
                polarity,
                values,
            }
        }
        "reset" => {
            no_more(&mut args, "reset")?;
            Command::Reset
        }
        "show" => {
            no_more(&mut args, "show")?;
            Command::Show
        }
        "complete" => {
            let mut url = None;
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--url" => url = Some(value_for(&mut args, "--url")?),
                    other => bail!("Unknown argument for complete: {other}"),
                }
            }
            Command::Complete {
                url: url.ok_or_else(|| anyhow!("complete requires --url"))?,
            }
        }
        "config" => {
            let mut write = None;
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--write" => write = Some(PathBuf::from(value_for(&mut args, "--write")?)),
                    other => bail!("Unknown argument for config: {other}"),
                }
            }
            Command::Config { write }
        }
        "help" => Command::Help,
        other => bail!("Unknown command: {other}"),
    };

    Ok(CliArgs {
        db_path: resolve_db_path(db_path),
        config_path,
        command,
    })
}

fn value_for(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next()
        .with_context(|| format!("Missing value for {flag}"))
}

fn parse_axis(arg: Option<String>) -> Result<FilterAxis> {
    let arg = arg.ok_or_else(|| anyhow!("Missing axis (prefix or period)"))?;
    FilterAxis::from_name(&arg).ok_or_else(|| anyhow!("Unknown axis: {arg}"))
}

fn no_more(args: &mut impl Iterator<Item = String>, command: &str) -> Result<()> {
    match args.next() {
        Some(extra) => bail!("Unexpected argument for {command}: {extra}"),
        None => Ok(()),
    }
}

fn resolve_db_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(|| std::env::var_os(DB_PATH_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliArgs> {
        parse_args(args.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn global_flags_precede_the_command() {
        let args = parse(&["--db", "/tmp/x.sqlite3", "--config", "c.json", "show"]).unwrap();
        assert_eq!(args.db_path, PathBuf::from("/tmp/x.sqlite3"));
        assert_eq!(args.config_path, Some(PathBuf::from("c.json")));
        assert_eq!(args.command, Command::Show);
    }

    #[test]
    fn filter_requires_url() {
        assert!(parse(&["filter"]).is_err());
        let args = parse(&["filter", "--url", "https://x/aura", "--request-id", "9"]).unwrap();
        assert_eq!(
            args.command,
            Command::Filter {
                url: "https://x/aura".into(),
                request_id: Some("9".into()),
            }
        );
    }

    #[test]
    fn toggle_and_set_parse_axes() {
        let args = parse(&["toggle", "periods", "III"]).unwrap();
        assert_eq!(
            args.command,
            Command::Toggle {
                axis: FilterAxis::Period,
                option: "III".into(),
            }
        );

        let args = parse(&["set", "prefix", "negative", "CS,MS", "ELEC"]).unwrap();
        assert_eq!(
            args.command,
            Command::Set {
                axis: FilterAxis::Prefix,
                polarity: Polarity::Negative,
                values: FilterValues::new(["CS", "MS", "ELEC"]),
            }
        );

        assert!(parse(&["toggle", "colour", "red"]).is_err());
        assert!(parse(&["toggle", "prefix", "CS", "extra"]).is_err());
    }

    #[test]
    fn no_arguments_means_help() {
        assert_eq!(parse(&[]).unwrap().command, Command::Help);
        assert!(parse(&["--bogus"]).is_err());
        assert!(parse(&["launch"]).is_err());
    }
}
