mod render;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use mrkyoto_core::catalog::{Catalog, Record};
use mrkyoto_core::engine::{category_counts, page_of, run};
use mrkyoto_core::live::tick;
use mrkyoto_core::persist::{Preferences, SledStore};
use mrkyoto_core::{Activity, Experience, Kind, Language, Listing, PriceTiers, Property, QuerySpec, Translations};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::io::{self, Write};
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

use render::Renderer;

#[derive(Parser)]
#[command(name = "mrkyoto-browse")]
#[command(about = "Search, filter and sort MrKyoto properties, activities and experiences", long_about = None)]
struct Cli {
    /// Preference store directory (falls back to $MRKYOTO_PREFS, then ./.mrkyoto)
    #[arg(long, global = true)]
    prefs: Option<String>,
    /// Display language: en, ja, zh or ko (falls back to $MRKYOTO_LANG, then the saved preference)
    #[arg(long, global = true)]
    lang: Option<Language>,
    /// Extra translation tables as JSON: {"ja": {"key": "text"}}
    #[arg(long, global = true)]
    translations: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct Source {
    /// properties, activities or experiences
    #[arg(long)]
    kind: Kind,
    /// JSON/JSONL file or directory to load instead of the bundled dataset
    #[arg(long)]
    data: Option<String>,
}

#[derive(Args, Clone, Default)]
struct QueryArgs {
    /// Free-text search over title, description and tags
    #[arg(long, default_value = "")]
    q: String,
    /// Filter as name=value, repeatable (category, price, duration, location,
    /// neighborhood, neighborhoods, bedrooms, features); "all" clears it
    #[arg(long = "filter", value_parser = parse_key_val)]
    filters: Vec<(String, String)>,
    /// newest, price-low, price-high, rating, featured, size, walk-score, year-built
    #[arg(long)]
    sort: Option<String>,
    #[arg(long)]
    page: Option<usize>,
    #[arg(long)]
    per_page: Option<usize>,
}

const MULTI_SELECT: [&str; 3] = ["neighborhoods", "bedrooms", "features"];

impl QueryArgs {
    /// Repeated multi-select filters merge into one comma list; any other
    /// repeated filter is an error.
    fn spec(&self) -> Result<QuerySpec> {
        let mut filters: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in &self.filters {
            match filters.get_mut(name) {
                None => {
                    filters.insert(name.clone(), value.clone());
                }
                Some(existing) if MULTI_SELECT.contains(&name.as_str()) => {
                    existing.push(',');
                    existing.push_str(value);
                }
                Some(_) => bail!("filter `{name}` given more than once"),
            }
        }
        Ok(QuerySpec {
            search: self.q.clone(),
            filters,
            sort: self.sort.clone(),
            page: self.page,
            per_page: self.per_page,
        })
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a query and print the matching listings
    Search {
        #[command(flatten)]
        source: Source,
        #[command(flatten)]
        query: QueryArgs,
        #[arg(long, default_value_t = false)]
        json: bool,
        /// Only show listings saved as favorites
        #[arg(long, default_value_t = false)]
        favorites_only: bool,
    },
    /// Category counts for the dataset
    Facets {
        #[command(flatten)]
        source: Source,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Manage favorite listings
    Favorite {
        #[command(flatten)]
        source: Source,
        #[command(subcommand)]
        action: FavoriteAction,
    },
    /// Manage saved searches
    Saved {
        #[command(flatten)]
        source: Source,
        #[command(subcommand)]
        action: SavedAction,
    },
    /// Simulate live price/rating updates and re-render after each one
    Watch {
        #[command(flatten)]
        source: Source,
        #[command(flatten)]
        query: QueryArgs,
        #[arg(long, default_value_t = 2_000)]
        interval_ms: u64,
        #[arg(long, default_value_t = 10)]
        ticks: usize,
        /// Fixed RNG seed for reproducible runs
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Show the display language, or save a new one
    Lang { code: Option<Language> },
}

#[derive(Subcommand)]
enum FavoriteAction {
    Toggle { id: String },
    List,
}

#[derive(Subcommand)]
enum SavedAction {
    Save {
        name: String,
        #[command(flatten)]
        query: QueryArgs,
    },
    List,
    Run {
        name: String,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    Delete { name: String },
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (k, v) = s.split_once('=').ok_or_else(|| format!("expected name=value, got `{s}`"))?;
    Ok((k.trim().to_string(), v.trim().to_string()))
}

struct App {
    prefs: Preferences<SledStore>,
    translations: Translations,
    lang: Language,
}

impl App {
    fn renderer(&self, json: bool) -> Renderer<'_> {
        Renderer { translations: &self.translations, lang: self.lang, json }
    }

    fn favorites(&self, kind: Kind) -> Result<HashSet<String>> {
        Ok(self.prefs.favorites(kind)?.into_iter().collect())
    }
}

/// Load the catalog for `source.kind` and hand it to a generic command.
macro_rules! dispatch {
    ($source:expr, |$catalog:ident| $body:expr) => {{
        let source = &$source;
        match source.kind {
            Kind::Properties => {
                let $catalog = load_catalog::<Property>(source)?;
                $body
            }
            Kind::Activities => {
                let $catalog = load_catalog::<Activity>(source)?;
                $body
            }
            Kind::Experiences => {
                let $catalog = load_catalog::<Experience>(source)?;
                $body
            }
        }
    }};
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(io::stderr).init();
    let cli = Cli::parse();

    let prefs_dir = cli
        .prefs
        .clone()
        .or_else(|| std::env::var("MRKYOTO_PREFS").ok())
        .unwrap_or_else(|| "./.mrkyoto".to_string());
    let prefs = Preferences::new(SledStore::open(&prefs_dir).with_context(|| format!("opening preferences at {prefs_dir}"))?);

    let mut translations = Translations::builtin();
    if let Some(path) = &cli.translations {
        let json = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
        translations.merge_json(&json)?;
    }

    let env_lang = std::env::var("MRKYOTO_LANG").ok().and_then(|code| code.parse().ok());
    let lang = match cli.lang.or(env_lang) {
        Some(lang) => lang,
        None => prefs.language()?,
    };
    tracing::debug!(%lang, prefs = %prefs_dir, "preferences loaded");

    let mut app = App { prefs, translations, lang };
    match cli.command {
        Commands::Lang { code } => cmd_lang(&mut app, code),
        Commands::Search { source, query, json, favorites_only } => {
            let opts = SearchOpts { spec: query.spec()?, json, favorites_only };
            dispatch!(source, |catalog| cmd_search(&app, catalog, &opts))
        }
        Commands::Facets { source, json } => dispatch!(source, |catalog| cmd_facets(&app, catalog, json)),
        Commands::Favorite { source, action } => cmd_favorite(&mut app, source.kind, action),
        Commands::Saved { source, action } => cmd_saved(&mut app, &source, action),
        Commands::Watch { source, query, interval_ms, ticks, seed } => {
            let opts = WatchOpts { spec: query.spec()?, interval: Duration::from_millis(interval_ms), ticks, seed };
            dispatch!(source, |catalog| cmd_watch(&app, catalog, &opts))
        }
    }
}

fn load_catalog<L: Record>(source: &Source) -> Result<Catalog<L>> {
    let catalog = match &source.data {
        Some(path) => Catalog::load_path(path).with_context(|| format!("loading {path}"))?,
        None => Catalog::bundled()?,
    };
    Ok(catalog)
}

struct SearchOpts {
    spec: QuerySpec,
    json: bool,
    favorites_only: bool,
}

fn cmd_search<L: Record + Serialize>(app: &App, catalog: Catalog<L>, opts: &SearchOpts) -> Result<()> {
    let kind = catalog.kind();
    let query = opts.spec.compile(kind, catalog.tiers())?;
    let favorites = app.favorites(kind)?;
    let mut results = run(catalog.listings(), &query);
    if opts.favorites_only {
        results.retain(|l| favorites.contains(l.id()));
    }
    let page = page_of(&results, query.page);
    tracing::info!(%kind, total = page.total, shown = page.items.len(), "search complete");

    let mut out = io::stdout().lock();
    app.renderer(opts.json).page(&mut out, kind, &page, &favorites)?;
    out.flush()?;
    Ok(())
}

fn cmd_facets<L: Record>(app: &App, catalog: Catalog<L>, json: bool) -> Result<()> {
    let counts = category_counts(catalog.listings());
    let mut out = io::stdout().lock();
    app.renderer(json).facets(&mut out, &counts)?;
    Ok(())
}

fn cmd_favorite(app: &mut App, kind: Kind, action: FavoriteAction) -> Result<()> {
    match action {
        FavoriteAction::Toggle { id } => {
            let now_favorite = app.prefs.toggle_favorite(kind, &id)?;
            let key = if now_favorite { "favorite.added" } else { "favorite.removed" };
            println!("{}", app.translations.format(app.lang, key, &[("id", id)]));
        }
        FavoriteAction::List => {
            for id in app.prefs.favorites(kind)? {
                println!("{id}");
            }
        }
    }
    Ok(())
}

fn cmd_saved(app: &mut App, source: &Source, action: SavedAction) -> Result<()> {
    let kind = source.kind;
    match action {
        SavedAction::Save { name, query } => {
            let spec = query.spec()?;
            // reject bad filters now rather than when the search is replayed
            spec.compile(kind, &PriceTiers::for_kind(kind))?;
            let saved = app.prefs.save_search(kind, &name, spec)?;
            println!("saved `{}` at {}", saved.name, saved.saved_at);
        }
        SavedAction::List => {
            for saved in app.prefs.saved_searches(kind)? {
                println!("{:<20} {}  {}", saved.name, saved.saved_at, serde_json::to_string(&saved.spec)?);
            }
        }
        SavedAction::Delete { name } => {
            if !app.prefs.delete_search(kind, &name)? {
                bail!("no saved search named `{name}` for {kind}");
            }
            println!("deleted `{name}`");
        }
        SavedAction::Run { name, json } => {
            let saved = app
                .prefs
                .saved_search(kind, &name)?
                .ok_or_else(|| anyhow!("no saved search named `{name}` for {kind}"))?;
            let opts = SearchOpts { spec: saved.spec, json, favorites_only: false };
            return dispatch!(*source, |catalog| cmd_search(app, catalog, &opts));
        }
    }
    Ok(())
}

struct WatchOpts {
    spec: QuerySpec,
    interval: Duration,
    ticks: usize,
    seed: Option<u64>,
}

fn cmd_watch<L: Record + Serialize>(app: &App, mut catalog: Catalog<L>, opts: &WatchOpts) -> Result<()> {
    let kind = catalog.kind();
    let query = opts.spec.compile(kind, catalog.tiers())?;
    let favorites = app.favorites(kind)?;
    let mut rng = match opts.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let renderer = app.renderer(false);
    let mut out = io::stdout().lock();

    renderer.page(&mut out, kind, &page_of(&run(catalog.listings(), &query), query.page), &favorites)?;
    for _ in 0..opts.ticks {
        std::thread::sleep(opts.interval);
        let Some(change) = tick(catalog.listings_mut(), &mut rng) else { continue };
        writeln!(out)?;
        renderer.change(&mut out, &change)?;
        renderer.page(&mut out, kind, &page_of(&run(catalog.listings(), &query), query.page), &favorites)?;
        out.flush()?;
    }
    Ok(())
}

fn cmd_lang(app: &mut App, code: Option<Language>) -> Result<()> {
    match code {
        Some(lang) => {
            app.prefs.set_language(lang)?;
            println!("{lang}");
        }
        None => println!("{}", app.lang),
    }
    Ok(())
}
