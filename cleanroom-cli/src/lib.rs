//! Command-line front end: argument model, validation and run execution.
//!
//! The binary in `main.rs` only parses arguments, installs logging and maps
//! the outcome to an exit code. Everything else lives here so it can be
//! driven from tests.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use cleanroom_crypto::SharedSecret;
use cleanroom_engine::{
    Engine, RowErrorPolicy, RunOptions, RunReport, Session, SettingsFileSource,
    DEFAULT_SECRET_ENV,
};
use cleanroom_io::{
    create_writer, open_reader, CsvOptions, FileFormat, MemoryRowWriter, RowReader,
};
use cleanroom_schema::{ClientSettings, Mode, Schema};
use cleanroom_types::CollaborationId;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(name = "cleanroom", version)]
#[command(about = "Column-level encryption for data shared in a clean room")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encrypt a cleartext file for upload to the collaboration
    Encrypt(RunArgs),
    /// Decrypt the sealed columns of a query result
    Decrypt(RunArgs),
}

impl Command {
    pub fn mode(&self) -> Mode {
        match self {
            Command::Encrypt(_) => Mode::Encrypt,
            Command::Decrypt(_) => Mode::Decrypt,
        }
    }

    pub fn args(&self) -> &RunArgs {
        match self {
            Command::Encrypt(args) | Command::Decrypt(args) => args,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// File to read rows from
    pub input: PathBuf,

    /// JSON schema describing the output columns
    #[arg(short, long)]
    pub schema: PathBuf,

    /// Collaboration id (UUID)
    #[arg(long)]
    pub id: String,

    /// File to write; required unless --dry-run
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Replace the output file if it exists
    #[arg(long)]
    pub overwrite: bool,

    /// Validate everything and process no rows
    #[arg(long)]
    pub dry_run: bool,

    /// Input and output format; inferred from the input extension if omitted
    #[arg(long)]
    pub file_format: Option<FileFormat>,

    /// JSON file with the collaboration's published settings
    #[arg(long)]
    pub collaboration_settings: Option<PathBuf>,

    /// Environment variable holding the base64 shared secret
    #[arg(long, default_value = DEFAULT_SECRET_ENV)]
    pub secret_env: String,

    #[arg(long)]
    pub allow_cleartext: Option<bool>,

    #[arg(long)]
    pub allow_duplicates: Option<bool>,

    #[arg(long)]
    pub allow_joins_on_columns_with_different_names: Option<bool>,

    #[arg(long)]
    pub preserve_nulls: Option<bool>,

    /// Worker threads; defaults to the available cores
    #[arg(long)]
    pub parallelism: Option<usize>,

    /// Skip rows that fail instead of aborting
    #[arg(long)]
    pub collect_row_errors: bool,
}

impl RunArgs {
    /// Checks everything that can be checked without touching the input.
    pub fn validate(&self) -> Result<CollaborationId> {
        if is_blank(&self.input) {
            bail!("input file path must not be blank");
        }
        if is_blank(&self.schema) {
            bail!("schema file path must not be blank");
        }
        if self.id.trim().is_empty() {
            bail!("collaboration id must not be blank");
        }
        let id = CollaborationId::parse(self.id.trim())
            .with_context(|| format!("invalid collaboration id {:?}", self.id))?;

        match &self.output {
            Some(output) if is_blank(output) => bail!("output file path must not be blank"),
            Some(output) if same_file(&self.input, output) => bail!(
                "output file {} is the input file; choose another path",
                output.display()
            ),
            Some(output) if output.exists() && !self.overwrite => {
                bail!(
                    "output file {} already exists; pass --overwrite to replace it",
                    output.display()
                )
            }
            None if !self.dry_run => bail!("--output is required unless --dry-run is set"),
            _ => {}
        }

        if self.parallelism == Some(0) {
            bail!("--parallelism must be at least 1");
        }
        Ok(id)
    }

    /// The settings given on the command line, if any flag was given.
    fn flag_settings(&self) -> [(&'static str, Option<bool>); 4] {
        [
            ("--allow-cleartext", self.allow_cleartext),
            ("--allow-duplicates", self.allow_duplicates),
            (
                "--allow-joins-on-columns-with-different-names",
                self.allow_joins_on_columns_with_different_names,
            ),
            ("--preserve-nulls", self.preserve_nulls),
        ]
    }

    /// Settings assembled from the four policy flags. All four are required.
    pub fn local_settings(&self) -> Result<ClientSettings> {
        let missing: Vec<&str> = self
            .flag_settings()
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(flag, _)| *flag)
            .collect();
        if !missing.is_empty() {
            bail!(
                "without --collaboration-settings every policy flag is required; missing {}",
                missing.join(", ")
            );
        }
        Ok(ClientSettings {
            allow_cleartext: self.allow_cleartext.unwrap_or_default(),
            allow_duplicates: self.allow_duplicates.unwrap_or_default(),
            allow_joins_on_columns_with_different_names: self
                .allow_joins_on_columns_with_different_names
                .unwrap_or_default(),
            preserve_nulls: self.preserve_nulls.unwrap_or_default(),
        })
    }

    /// Fails if a policy flag contradicts the collaboration's settings.
    fn check_flags_agree(&self, settings: &ClientSettings) -> Result<()> {
        let published = [
            settings.allow_cleartext,
            settings.allow_duplicates,
            settings.allow_joins_on_columns_with_different_names,
            settings.preserve_nulls,
        ];
        for ((flag, given), published) in self.flag_settings().into_iter().zip(published) {
            if let Some(given) = given {
                if given != published {
                    bail!(
                        "{flag} {given} contradicts the collaboration's setting ({published})"
                    );
                }
            }
        }
        Ok(())
    }

    /// Resolves the session: from the collaboration when settings are
    /// given, otherwise from the local flags (dry runs only).
    pub fn session(&self, id: CollaborationId) -> Result<Session> {
        if let Some(path) = &self.collaboration_settings {
            let source = SettingsFileSource::new(path).with_secret_env(&self.secret_env);
            let session = Session::establish(&source, id)
                .context("failed to resolve the collaboration's settings")?;
            self.check_flags_agree(session.settings())?;
            return Ok(session);
        }

        if !self.dry_run {
            bail!("--collaboration-settings is required unless --dry-run is set");
        }
        let settings = self.local_settings()?;
        let secret = match std::env::var(&self.secret_env) {
            Ok(encoded) => SharedSecret::from_base64(&encoded)
                .with_context(|| format!("{} does not hold a valid secret", self.secret_env))?,
            Err(_) => {
                debug!(
                    variable = %self.secret_env,
                    "no shared secret set; dry run uses a random one"
                );
                SharedSecret::random()
            }
        };
        Session::local(id, settings, &secret).context("failed to derive keys")
    }

    pub fn run_options(&self) -> RunOptions {
        let defaults = RunOptions::default();
        RunOptions {
            parallelism: self.parallelism.unwrap_or(defaults.parallelism),
            row_errors: if self.collect_row_errors {
                RowErrorPolicy::Collect
            } else {
                RowErrorPolicy::Abort
            },
            dry_run: self.dry_run,
            ..defaults
        }
    }
}

fn is_blank(path: &Path) -> bool {
    path.as_os_str().to_string_lossy().trim().is_empty()
}

/// True if both paths name the same existing file.
fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Runs one encrypt or decrypt command to completion.
///
/// On failure the partially written output file is removed.
pub fn execute(command: &Command) -> Result<RunReport> {
    let mode = command.mode();
    let args = command.args();
    let id = args.validate()?;
    let session = args.session(id)?;

    let schema = Schema::from_path(&args.schema)
        .with_context(|| format!("failed to load schema {}", args.schema.display()))?;
    let format = FileFormat::resolve(args.file_format, &args.input)?;
    let csv = CsvOptions {
        allow_duplicate_headers: session.settings().allow_duplicates,
        ..CsvOptions::default()
    };
    let mut reader = open_reader(&args.input, format, &csv)
        .with_context(|| format!("failed to open {}", args.input.display()))?;

    let engine = Engine::prepare(&session, &schema, mode, reader.header(), args.run_options())?;

    let output = match (&args.output, args.dry_run) {
        (Some(output), false) => output,
        _ => {
            let mut discard = MemoryRowWriter::new(engine.output_header().clone());
            let report = engine.run(&mut reader, &mut discard)?;
            info!(collaboration = %id, ?mode, "dry run complete");
            return Ok(report);
        }
    };

    let mut writer = create_writer(
        output,
        engine.output_header().clone(),
        format,
        &csv,
        args.overwrite,
    )
    .with_context(|| format!("failed to create {}", output.display()))?;

    let outcome = engine.run(&mut reader, &mut writer).and_then(|report| {
        writer.close()?;
        Ok(report)
    });
    drop(writer);

    match outcome {
        Ok(report) => {
            info!(
                output = %output.display(),
                rows = report.rows_written,
                failed = report.failures.len(),
                "output written"
            );
            Ok(report)
        }
        Err(e) => {
            if let Err(remove) = std::fs::remove_file(output) {
                warn!(
                    output = %output.display(),
                    error = %remove,
                    "could not remove partial output"
                );
            }
            Err(e).with_context(|| format!("{mode:?} of {} failed", args.input.display()))
        }
    }
}
