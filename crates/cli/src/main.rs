use anyhow::{bail, Context, Result};
use chatmap_cli::{serve, AppState, ChatmapConfig};
use chatmap_graph::{DateRange, FilterCriteria, Projector};
use chatmap_protocol::{
    renderer_schema, serialize_json, serialize_json_pretty, FocusRequest, ViewFrame,
};
use chatmap_session::{ChatSession, NullDetail, NullRenderer};
use chatmap_store::{
    AnnotationService, CommandRefresh, DatasetSource, HttpAnnotations, JsonFileStore,
    NoopRefresh, RefreshTrigger,
};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "chatmap")]
#[command(about = "Browse and annotate a forest of branching chats", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding chat_data.json and the annotation files (overrides CHATMAP_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file (default: chatmap.toml in the data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Talk to a running `chatmap serve` instead of local files
    #[arg(long, global = true)]
    server: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter the forest and print the projected frame
    View(ViewArgs),

    /// Print the details of one chat
    Show {
        id: String,
    },

    /// Toggle a chat's favorite state
    Favorite {
        id: String,
    },

    /// Assign or unassign a tag on one chat
    #[command(subcommand)]
    Tag(TagCommand),

    /// Manage the tag vocabulary
    #[command(subcommand)]
    Vocab(VocabCommand),

    /// Fill missing parent links from children lists and rewrite the dataset
    Repair,

    /// Run the configured ingestion command, then reload
    Refresh,

    /// Serve the annotation HTTP API
    Serve(ServeArgs),

    /// Print the JSON schema of the renderer payloads
    Schema,
}

#[derive(Args)]
struct ViewArgs {
    /// Case-insensitive substring of the chat name
    #[arg(long, short)]
    query: Option<String>,

    /// Only chats carrying this tag
    #[arg(long)]
    tag: Option<String>,

    /// Only favorites
    #[arg(long)]
    favorites: bool,

    /// Only chats with a parent or children
    #[arg(long)]
    branches: bool,

    /// First modification day to include (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last modification day to include (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,
}

impl ViewArgs {
    fn criteria(&self) -> FilterCriteria {
        FilterCriteria {
            text_query: self.query.clone().unwrap_or_default(),
            tag: self.tag.clone(),
            favorites_only: self.favorites,
            has_branch_only: self.branches,
            date_range: DateRange {
                start: self.from,
                end: self.to,
            },
        }
    }
}

#[derive(Subcommand)]
enum TagCommand {
    Add { id: String, tag: String },
    Remove { id: String, tag: String },
}

#[derive(Subcommand)]
enum VocabCommand {
    Add { tag: String },
    Remove { tag: String },
    List,
}

#[derive(Args)]
struct ServeArgs {
    /// Bind address (default from config, 127.0.0.1:5000)
    #[arg(long)]
    bind: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ViewOutput<'a> {
    frame: &'a ViewFrame,
    focus: Option<FocusRequest>,
}

#[derive(Serialize)]
struct FavoriteOutput<'a> {
    id: &'a str,
    favorite: bool,
}

#[derive(Serialize)]
struct TagOutput<'a> {
    id: &'a str,
    tag: &'a str,
    changed: bool,
    tags: Vec<String>,
}

#[derive(Serialize)]
struct VocabOutput<'a> {
    tag: &'a str,
    changed: bool,
    vocabulary: Vec<String>,
}

#[derive(Serialize)]
struct RepairOutput {
    repaired: usize,
}

struct App {
    config: ChatmapConfig,
    server: Option<String>,
    pretty: bool,
}

impl App {
    fn print<T: Serialize>(&self, value: &T) -> Result<()> {
        let out = if self.pretty {
            serialize_json_pretty(value)?
        } else {
            serialize_json(value)?
        };
        println!("{out}");
        Ok(())
    }

    fn backend(&self) -> Result<(Arc<dyn DatasetSource>, Arc<dyn AnnotationService>)> {
        match &self.server {
            Some(url) => {
                let client = Arc::new(HttpAnnotations::new(url.as_str())?);
                let source: Arc<dyn DatasetSource> = client.clone();
                let annotations: Arc<dyn AnnotationService> = client;
                Ok((source, annotations))
            }
            None => {
                let files = Arc::new(JsonFileStore::new(self.config.data.clone()));
                let source: Arc<dyn DatasetSource> = files.clone();
                let annotations: Arc<dyn AnnotationService> = files;
                Ok((source, annotations))
            }
        }
    }

    fn refresh_trigger(&self) -> Arc<dyn RefreshTrigger> {
        match CommandRefresh::new(self.config.server.refresh_command.clone()) {
            Some(command) => Arc::new(command.in_dir(self.config.data.dir.clone())),
            None => Arc::new(NoopRefresh),
        }
    }

    fn session(&self) -> Result<ChatSession> {
        let (source, annotations) = self.backend()?;
        Ok(ChatSession::new(
            source,
            annotations,
            Box::new(NullRenderer),
            Box::new(NullDetail),
        )
        .with_refresh(self.refresh_trigger())
        .with_projection(self.config.view.clone())
        .with_focus(self.config.focus.clone()))
    }

    async fn loaded_session(&self) -> Result<ChatSession> {
        let mut session = self.session()?;
        session.load().await.context("Failed to load chats")?;
        Ok(session)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config = ChatmapConfig::resolve(cli.config.as_deref(), cli.data_dir.as_deref())?;
    log::debug!("Data directory: {}", config.data.dir.display());

    let ctx = App {
        config,
        server: cli.server,
        pretty: cli.pretty,
    };

    match cli.command {
        Commands::View(args) => run_view(&ctx, args).await?,
        Commands::Show { id } => run_show(&ctx, &id).await?,
        Commands::Favorite { id } => run_favorite(&ctx, &id).await?,
        Commands::Tag(cmd) => run_tag(&ctx, cmd).await?,
        Commands::Vocab(cmd) => run_vocab(&ctx, cmd).await?,
        Commands::Repair => run_repair(&ctx).await?,
        Commands::Refresh => run_refresh(&ctx).await?,
        Commands::Serve(args) => run_serve(ctx, args).await?,
        Commands::Schema => ctx.print(&renderer_schema())?,
    }

    Ok(())
}

async fn run_view(ctx: &App, args: ViewArgs) -> Result<()> {
    let mut session = ctx.session()?;
    session.set_criteria(args.criteria());
    let focus = session.load().await.context("Failed to load chats")?;
    ctx.print(&ViewOutput {
        frame: session.frame(),
        focus,
    })
}

async fn run_show(ctx: &App, id: &str) -> Result<()> {
    let session = ctx.loaded_session().await?;
    let Some(detail) = session.store().detail(id) else {
        bail!("Chat not found: {id}");
    };
    ctx.print(&detail)
}

async fn run_favorite(ctx: &App, id: &str) -> Result<()> {
    let mut session = ctx.loaded_session().await?;
    let favorite = session.toggle_favorite(id).await?;
    ctx.print(&FavoriteOutput { id, favorite })
}

async fn run_tag(ctx: &App, cmd: TagCommand) -> Result<()> {
    let mut session = ctx.loaded_session().await?;
    let (id, tag, changed) = match &cmd {
        TagCommand::Add { id, tag } => (id, tag, session.add_tag(id, tag).await?),
        TagCommand::Remove { id, tag } => (id, tag, session.remove_tag(id, tag).await?),
    };
    ctx.print(&TagOutput {
        id,
        tag: tag.trim(),
        changed,
        tags: session.store().tags_of(id),
    })
}

async fn run_vocab(ctx: &App, cmd: VocabCommand) -> Result<()> {
    let mut session = ctx.loaded_session().await?;
    let (tag, changed) = match &cmd {
        VocabCommand::Add { tag } => (tag, session.add_global_tag(tag).await?),
        VocabCommand::Remove { tag } => (tag, session.remove_global_tag(tag).await?),
        VocabCommand::List => {
            return ctx.print(&session.store().overlay().vocabulary_doc());
        }
    };
    ctx.print(&VocabOutput {
        tag: tag.trim(),
        changed,
        vocabulary: session.store().overlay().vocabulary_doc(),
    })
}

async fn run_repair(ctx: &App) -> Result<()> {
    if ctx.server.is_some() {
        bail!("repair works on local files; drop --server");
    }
    let files = JsonFileStore::new(ctx.config.data.clone());
    let repaired = files.repair_dataset().await?;
    ctx.print(&RepairOutput { repaired })
}

async fn run_refresh(ctx: &App) -> Result<()> {
    let mut session = ctx.session()?;
    session.refresh().await?;
    ctx.print(&session.frame().counter)
}

async fn run_serve(ctx: App, args: ServeArgs) -> Result<()> {
    if ctx.server.is_some() {
        bail!("serve reads local files; drop --server");
    }
    let bind = args.bind.unwrap_or_else(|| ctx.config.server.bind.clone());
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    let state = Arc::new(AppState {
        store: JsonFileStore::new(ctx.config.data.clone()),
        projector: Projector::new(ctx.config.view.clone()),
    });
    serve(listener, state).await
}
