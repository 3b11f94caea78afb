//! Interactive session over the async controller. Each stdin line is one
//! user action; every state change is printed as it is published.

use fra_atlas_client::{AtlasHandle, ClaimSource, Command};
use fra_atlas_core::{AtlasConfig, AtlasView, ClaimId};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::render;

const HELP: &str = "\
commands:
  type <text>       set the search text (debounced)
  status <value>    status filter (empty clears)
  state <value>     state filter (empty clears)
  district <value>  district filter (empty clears)
  view <id>         show one result on the map
  all               show every result on the map
  select <id>       select a claim on the map
  reset             clear search, filters and selection
  reload            refetch all claims
  show              print the current state
  quit";

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Command(Command),
    Show,
    Help,
    Quit,
}

fn parse_id(verb: &str, arg: &str) -> Result<ClaimId, String> {
    arg.trim().parse().map_err(|_| format!("{verb} expects a claim id, got {arg:?}"))
}

fn parse_input(line: &str) -> Result<Option<Input>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, arg) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let arg = arg.trim().to_string();

    let input = match verb {
        "type" | "q" => Input::Command(Command::SetQueryText(arg)),
        "status" => Input::Command(Command::SetStatusFilter(arg)),
        "state" => Input::Command(Command::SetStateFilter(arg)),
        "district" => Input::Command(Command::SetDistrictFilter(arg)),
        "view" => Input::Command(Command::ViewOne(parse_id(verb, &arg)?)),
        "select" => Input::Command(Command::Select(parse_id(verb, &arg)?)),
        "all" => Input::Command(Command::ViewAll),
        "reset" => Input::Command(Command::Reset),
        "reload" => Input::Command(Command::Reload),
        "show" => Input::Show,
        "help" | "?" => Input::Help,
        "quit" | "exit" => Input::Quit,
        other => return Err(format!("unknown command {other:?} (try help)")),
    };
    Ok(Some(input))
}

fn print_view(view: &AtlasView, json: bool) {
    if json {
        match serde_json::to_string(view) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::error!(error = %e, "Could not serialize view"),
        }
    } else {
        println!("{}", render::view(view));
    }
}

pub async fn run<S: ClaimSource + 'static>(config: &AtlasConfig, source: S, json: bool) {
    let handle = AtlasHandle::spawn(config, source);

    let mut updates = handle.subscribe();
    let printer = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let view = updates.borrow_and_update().clone();
            print_view(&view, json);
        }
    });

    if !json {
        eprintln!("{HELP}");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "Could not read stdin");
                break;
            }
        };
        match parse_input(&line) {
            Ok(Some(Input::Command(command))) => {
                handle.send(command);
            }
            Ok(Some(Input::Show)) => print_view(&handle.view(), json),
            Ok(Some(Input::Help)) => eprintln!("{HELP}"),
            Ok(Some(Input::Quit)) => break,
            Ok(None) => {}
            Err(msg) => eprintln!("{msg}"),
        }
    }

    handle.shutdown().await;
    let _ = printer.await;
}
