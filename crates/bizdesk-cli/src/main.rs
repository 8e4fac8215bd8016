// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result, anyhow, bail};
use bizdesk_api::{Backend, Client, DemoBackend};
use bizdesk_app::{ResourceKind, TenantContext};
use bizdesk_tui::{TuiState, UiOptions};
use config::Config;
use runtime::BackendRuntime;
use std::env;
use std::path::PathBuf;
use tracing::info;

const DEMO_SEED: u64 = 42;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print!("{}", help_text());
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `bizdesk --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;
    logging::init(&config)?;

    let context = match &options.tenant {
        Some(tenant) => TenantContext::new(tenant.as_str(), config.role()),
        None => config.tenant_context(options.demo)?,
    };
    let mut ui = config.ui_options();
    if let Some(tab) = options.start_tab {
        ui.start_tab = tab;
    }
    if options.demo {
        info!(tenant = %context.tenant_id, "starting with demo data");
        let backend = DemoBackend::new(
            context.clone(),
            bizdesk_testkit::demo_collections(DEMO_SEED),
        );
        return launch(backend, context, ui, options.check_only);
    }

    let token = config.api_token();
    let client = Client::new(
        config.base_url(),
        context.clone(),
        token.as_deref(),
        config.api_timeout()?,
    )
    .with_context(|| {
        format!(
            "invalid [api] config in {}; fix base_url/tenant_id/token values",
            options.config_path.display()
        )
    })?;
    info!(
        base_url = client.base_url(),
        tenant = %context.tenant_id,
        role = context.role.as_str(),
        "starting"
    );
    launch(client, context, ui, options.check_only)
}

fn launch<B: Backend + 'static>(
    backend: B,
    context: TenantContext,
    ui: UiOptions,
    check_only: bool,
) -> Result<()> {
    if check_only {
        return backend.ping().context("backend check failed");
    }

    let mut state = TuiState::new(context, ui);
    let mut runtime = BackendRuntime::new(backend);
    bizdesk_tui::run_app(&mut state, &mut runtime)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    /// Workspace to open instead of `[api].tenant_id`.
    tenant: Option<String>,
    /// Tab to open instead of `[ui].start_tab`.
    start_tab: Option<ResourceKind>,
    demo: bool,
    check_only: bool,
    print_config_path: bool,
    print_example: bool,
    show_help: bool,
}

impl CliOptions {
    fn new(config_path: PathBuf) -> Self {
        Self {
            config_path,
            tenant: None,
            start_tab: None,
            demo: false,
            check_only: false,
            print_config_path: false,
            print_example: false,
            show_help: false,
        }
    }
}

/// Accepts `--flag value` and `--flag=value` for the options that take one.
fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions::new(default_config_path);
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        let arg = arg.as_ref();
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag, Some(value.to_owned())),
            _ => (arg, None),
        };
        let mut value = |what: &str| -> Result<String> {
            let value = match inline.clone() {
                Some(value) => value,
                None => iter
                    .next()
                    .map(|value| value.as_ref().to_owned())
                    .ok_or_else(|| anyhow!("{flag} requires {what}"))?,
            };
            if value.trim().is_empty() {
                bail!("{flag} requires {what}");
            }
            Ok(value)
        };
        match flag {
            "--config" => options.config_path = PathBuf::from(value("a file path")?),
            "--tenant" => options.tenant = Some(value("a workspace id")?.trim().to_owned()),
            "--tab" => {
                let name = value("a tab name")?;
                let tab = ResourceKind::parse(name.trim()).ok_or_else(|| {
                    anyhow!("unknown tab {name:?}; expected one of {}", tab_names())
                })?;
                options.start_tab = Some(tab);
            }
            "--demo" => options.demo = true,
            "--check" => options.check_only = true,
            "--print-config-path" => options.print_config_path = true,
            "--print-example-config" => options.print_example = true,
            "--help" | "-h" => options.show_help = true,
            unknown => {
                bail!("unknown argument {unknown:?}; run with --help to see supported options")
            }
        }
        if inline.is_some() && !matches!(flag, "--config" | "--tenant" | "--tab") {
            bail!("{flag} does not take a value");
        }
    }

    Ok(options)
}

fn tab_names() -> String {
    ResourceKind::ALL
        .iter()
        .map(|kind| kind.label())
        .collect::<Vec<_>>()
        .join(", ")
}

fn help_text() -> String {
    format!(
        "\
bizdesk: team members, goals and catalog items for one workspace

usage: bizdesk [options]

  --config <path>          Config file (default: $BIZDESK_CONFIG_PATH or the user config dir)
  --tenant <id>            Open this workspace instead of [api].tenant_id
  --tab <name>             Start on a tab: {tabs}
  --demo                   Use seeded in-memory data, no backend (workspace \"{demo}\")
  --check                  Load config and ping the backend's members list, then exit
  --print-config-path      Print the resolved config path
  --print-example-config   Print a commented config template
  -h, --help               Show this help

environment:
  {token}        Bearer token when [api].token is unset
  {log}              Log filter, overrides [log].level
",
        tabs = tab_names(),
        demo = config::DEMO_TENANT,
        token = config::TOKEN_ENV,
        log = logging::LOG_ENV,
    )
}
