use anyhow::Result;
use clap::{Parser, Subcommand};
use mpc_core::model::{Node, NodeId};
use mpc_core::catalog::parse_base_url;
use mpc_core::url::{FavoritesDescriptor, SolutionInstallationInfo};
use mpc_core::{
    describe_install_failure, init_logging, AppDirs, CatalogDescriptor, CatalogRegistry, Config,
    CredentialStore, LinkDispatcher, MarketplaceLink, MarketplaceService, ResourceFetcher,
    SearchQuery, TracingProgressMonitor,
};
use rest_marketplace::{HttpResourceRetriever, RestMarketplaceConfig, RestMarketplaceService};
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Runtime;
use url::Url;

#[derive(Debug, Parser)]
#[command(name = "mpc", version, about = "Marketplace client")]
struct Cli {
    /// Catalog base URL (takes precedence over config)
    #[arg(long, global = true)]
    catalog: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve an install or favorites link and show what it refers to
    Open {
        url: String,
    },
    /// Search listings
    Search(SearchCommand),
    /// Show one listing
    Node {
        id: String,
    },
    /// List known catalogs
    Catalogs {
        /// Also ask the catalog server for the catalogs it advertises
        #[arg(long)]
        remote: bool,
    },
    /// Show catalog branding
    Branding {
        /// Download wizard icons into the resource cache
        #[arg(long)]
        download: bool,
    },
    /// Manage the access token stored in the OS keyring
    #[command(subcommand)]
    Token(TokenCommand),
}

#[derive(Debug, Subcommand)]
enum TokenCommand {
    Set { token: String },
    Clear,
}

#[derive(Debug, Parser, Clone)]
struct SearchCommand {
    query: String,
    #[arg(long)]
    market: Option<String>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long, default_value_t = 0)]
    page: u32,
    #[arg(long, default_value_t = 20)]
    page_size: u32,
}

impl SearchCommand {
    fn query(&self) -> SearchQuery {
        let mut query = SearchQuery::text(self.query.clone());
        if let Some(market) = &self.market {
            query = query.in_market(market.clone());
        }
        if let Some(category) = &self.category {
            query = query.in_category(category.clone());
        }
        query.page = self.page;
        query.page_size = self.page_size;
        query
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error("{0} is not an install or favorites link")]
    UnrecognisedLink(String),
    #[error("{0}")]
    Catalog(#[from] mpc_core::CatalogError),
}

/// Catalog to talk to: the `--catalog` override, else the first registered
/// catalog matching the link, else the configured default.
fn select_catalog(
    registry: &CatalogRegistry,
    config: &Config,
    override_url: Option<&str>,
) -> Result<CatalogDescriptor, CliError> {
    if let Some(url) = override_url {
        return match registry.find_by_url(url) {
            Some(found) => Ok(found),
            None => Ok(CatalogDescriptor::new(url, url)?),
        };
    }
    match registry.find_by_url(&config.marketplace.default_catalog) {
        Some(found) => Ok(found),
        None => Ok(CatalogDescriptor::new(
            &config.marketplace.default_catalog,
            mpc_core::config::DEFAULT_CATALOG_LABEL,
        )?),
    }
}

fn link_catalog(link: &MarketplaceLink) -> Option<&CatalogDescriptor> {
    match link {
        MarketplaceLink::Install(info) => info.catalog.as_ref(),
        MarketplaceLink::ImportFavorites(favorites) => favorites.catalog.as_ref(),
    }
}

/// Catalog a link with no registered catalog points at.
fn implied_catalog(link: &MarketplaceLink) -> Option<CatalogDescriptor> {
    let requested = match link {
        MarketplaceLink::Install(info) => info.requested_url.as_str(),
        MarketplaceLink::ImportFavorites(favorites) => favorites.favorites_url.as_str(),
    };
    let url = Url::parse(requested).ok()?;
    let host = url.host_str()?;
    CatalogDescriptor::new(&format!("https://{host}/"), host).ok()
}

/// Catalog serving `link`, and whether it is only implied by the link's
/// host. Implied catalogs are never sent credentials.
fn open_catalog(
    registry: &CatalogRegistry,
    config: &Config,
    link: &MarketplaceLink,
    override_url: Option<&str>,
) -> Result<(CatalogDescriptor, bool), CliError> {
    if override_url.is_some() {
        return Ok((select_catalog(registry, config, override_url)?, false));
    }
    if let Some(catalog) = link_catalog(link) {
        return Ok((catalog.clone(), false));
    }
    match implied_catalog(link) {
        Some(catalog) => Ok((catalog, true)),
        None => Ok((select_catalog(registry, config, None)?, false)),
    }
}

struct Session {
    config: Config,
    dirs: AppDirs,
    registry: CatalogRegistry,
    credentials: CredentialStore,
    runtime: Runtime,
}

impl Session {
    fn service(&self, catalog: &CatalogDescriptor) -> Result<RestMarketplaceService> {
        let default_catalog = parse_base_url(&self.config.marketplace.default_catalog)?;
        let token = self.credentials.resolve_access_token(
            &catalog.url,
            self.config.marketplace.access_token.as_deref(),
            &default_catalog,
        );
        self.build_service(catalog, token)
    }

    fn anonymous_service(&self, catalog: &CatalogDescriptor) -> Result<RestMarketplaceService> {
        self.build_service(catalog, None)
    }

    fn build_service(
        &self,
        catalog: &CatalogDescriptor,
        token: Option<String>,
    ) -> Result<RestMarketplaceService> {
        let config = RestMarketplaceConfig::for_catalog(catalog, &self.config.marketplace, token);
        Ok(RestMarketplaceService::new(config)?)
    }

    fn open(&self, url: &str, override_url: Option<&str>) -> Result<()> {
        let dispatcher = LinkDispatcher::new();
        let link = dispatcher
            .dispatch(url, &self.registry)
            .ok_or_else(|| CliError::UnrecognisedLink(url.to_string()))?;
        let (catalog, implied) = open_catalog(&self.registry, &self.config, &link, override_url)?;
        let service = if implied {
            tracing::info!(catalog = %catalog.url, "unregistered catalog, sending no credentials");
            self.anonymous_service(&catalog)?
        } else {
            self.service(&catalog)?
        };

        match link {
            MarketplaceLink::Install(info) => self.open_install(&service, &catalog, &info),
            MarketplaceLink::ImportFavorites(favorites) => {
                self.open_favorites(&service, &catalog, &favorites)
            }
        }
    }

    fn open_install(
        &self,
        service: &RestMarketplaceService,
        catalog: &CatalogDescriptor,
        info: &SolutionInstallationInfo,
    ) -> Result<()> {
        println!("Install request for listing {} via {}", info.install_id, catalog.label);
        if let Some(link) = info.install_url() {
            tracing::debug!(link = %link, "canonical install link");
        }
        match self.runtime.block_on(service.node(&info.install_id)) {
            Ok(node) => {
                print_node(&node);
                if !node.is_installable() {
                    println!("  (listing has no installable units)");
                }
                Ok(())
            }
            Err(e) => {
                let status = describe_install_failure(&catalog.label, &e);
                tracing::warn!(error = %e, "install lookup failed");
                println!("{status}");
                Ok(())
            }
        }
    }

    fn open_favorites(
        &self,
        service: &RestMarketplaceService,
        catalog: &CatalogDescriptor,
        favorites: &FavoritesDescriptor,
    ) -> Result<()> {
        let list = self
            .runtime
            .block_on(service.favorite_list(&favorites.favorites_url))?;
        println!(
            "Favorites of {} on {} ({} listings)",
            list.owner.as_deref().unwrap_or("unknown user"),
            catalog.label,
            list.nodes.len()
        );
        for node in &list.nodes {
            println!("  - {}", node_title(node));
        }
        Ok(())
    }

    fn search(&self, catalog: &CatalogDescriptor, command: &SearchCommand) -> Result<()> {
        let service = self.service(catalog)?;
        let result = self.runtime.block_on(service.search(&command.query()))?;
        println!("{} matches for \"{}\"", result.match_count, command.query);
        for node in &result.nodes {
            println!("  {}", node_title(node));
        }
        Ok(())
    }

    fn node(&self, catalog: &CatalogDescriptor, id: &str) -> Result<()> {
        let service = self.service(catalog)?;
        let node = self.runtime.block_on(service.node(&NodeId::new(id)))?;
        print_node(&node);
        Ok(())
    }

    fn catalogs(&self, catalog: &CatalogDescriptor, remote: bool) -> Result<()> {
        if remote {
            let service = self.service(catalog)?;
            for advertised in self.runtime.block_on(service.catalogs())? {
                match CatalogDescriptor::from_catalog(&advertised) {
                    Ok(descriptor) => self.registry.register(descriptor),
                    Err(e) => tracing::warn!(error = %e, "ignoring advertised catalog"),
                }
            }
        }
        for descriptor in self.registry.descriptors() {
            let marker = if descriptor.url == catalog.url {
                " (selected)"
            } else {
                ""
            };
            println!("{}{} <{}>", descriptor.label, marker, descriptor.url);
            if let Some(description) = &descriptor.description {
                println!("  {description}");
            }
        }
        Ok(())
    }

    fn branding(&self, catalog: &CatalogDescriptor, download: bool) -> Result<()> {
        let service = self.service(catalog)?;
        let catalogs = self.runtime.block_on(service.catalogs())?;
        let brandings: Vec<_> = catalogs
            .iter()
            .filter_map(|c| c.branding.as_ref().map(|b| (c, b)))
            .collect();
        if brandings.is_empty() {
            println!("{} advertises no branding", catalog.label);
            return Ok(());
        }

        let mut icons = Vec::new();
        for (advertised, branding) in &brandings {
            println!(
                "{}: {}",
                advertised.name.as_deref().unwrap_or("catalog"),
                branding.wizard_title.as_deref().unwrap_or("(untitled)")
            );
            let tabs = [
                ("search", branding.has_search_tab),
                ("popular", branding.has_popular_tab),
                ("recent", branding.has_recent_tab),
                ("related", branding.has_related_tab),
                ("featured market", branding.has_featured_market_tab),
                ("favorites", branding.has_favorites_tab),
            ];
            let enabled: Vec<_> = tabs
                .iter()
                .filter(|(_, on)| *on)
                .map(|(name, _)| *name)
                .collect();
            println!("  tabs: {}", enabled.join(", "));
            icons.extend(branding.resource_urls().into_iter().map(str::to_string));
        }

        if download && !icons.is_empty() {
            let retriever =
                HttpResourceRetriever::new(self.config.marketplace.request_timeout())?;
            let fetcher = ResourceFetcher::new(Arc::new(retriever), self.dirs.resource_cache_dir())
                .with_max_threads(self.config.tasks.max_threads)
                .with_task_config(self.config.tasks.task_manager_config());
            let paths = fetcher.fetch_all(&icons, &TracingProgressMonitor::new())?;
            for path in paths {
                println!("  icon: {}", path.display());
            }
        }
        Ok(())
    }

    fn token(&self, catalog: &CatalogDescriptor, command: &TokenCommand) -> Result<()> {
        match command {
            TokenCommand::Set { token } => {
                self.credentials.store_access_token(&catalog.url, token)?;
                println!("Stored access token for {}", catalog.label);
            }
            TokenCommand::Clear => {
                self.credentials.delete_access_token(&catalog.url)?;
                println!("Cleared access token for {}", catalog.label);
            }
        }
        Ok(())
    }
}

fn node_title(node: &Node) -> String {
    format!(
        "[{}] {}",
        node.id.as_ref().map(|id| id.0.as_str()).unwrap_or("?"),
        node.name.as_deref().unwrap_or("(unnamed)")
    )
}

fn print_node(node: &Node) {
    println!("{}", node_title(node));
    if let Some(description) = &node.short_description {
        println!("  {description}");
    }
    if let Some(update_url) = &node.update_url {
        println!("  update site: {update_url}");
    }
    let selected = node.ius.selected_ids();
    if !selected.is_empty() {
        println!("  installs: {}", selected.join(", "));
    }
    let tags: Vec<_> = node.tags.names().collect();
    if !tags.is_empty() {
        println!("  tags: {}", tags.join(", "));
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let dirs = AppDirs::discover()?;
    let config = Config::load_or_default(&dirs)?;
    let _logging = init_logging(&config.logging, &dirs)?;
    let registry = config.catalog_registry()?;
    let catalog = select_catalog(&registry, &config, cli.catalog.as_deref())?;
    tracing::info!(
        catalog = %catalog.url,
        config_dir = %dirs.config_dir().display(),
        "starting"
    );

    let session = Session {
        config,
        dirs,
        registry,
        credentials: CredentialStore::new(),
        runtime: Runtime::new()?,
    };

    match &cli.command {
        Command::Open { url } => session.open(url, cli.catalog.as_deref()),
        Command::Search(search) => session.search(&catalog, search),
        Command::Node { id } => session.node(&catalog, id),
        Command::Catalogs { remote } => session.catalogs(&catalog, *remote),
        Command::Branding { download } => session.branding(&catalog, *download),
        Command::Token(token) => session.token(&catalog, token),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_command_builds_query() {
        let command = SearchCommand {
            query: "rust".into(),
            market: Some("m1".into()),
            category: None,
            page: 2,
            page_size: 50,
        };
        let query = command.query();
        assert_eq!(query.text.as_deref(), Some("rust"));
        assert_eq!(query.market_id.as_deref(), Some("m1"));
        assert_eq!(query.category_id, None);
        assert_eq!((query.page, query.page_size), (2, 50));
    }

    #[test]
    fn override_catalog_wins() {
        let config = Config::default();
        let registry = config.catalog_registry().expect("registry");
        let catalog = select_catalog(&registry, &config, Some("https://mirror.example.org/mp"))
            .expect("catalog");
        assert_eq!(catalog.url.as_str(), "https://mirror.example.org/mp/");

        let catalog = select_catalog(&registry, &config, None).expect("default");
        assert_eq!(catalog.label, mpc_core::config::DEFAULT_CATALOG_LABEL);
    }

    #[test]
    fn unregistered_links_imply_their_host() {
        let dispatcher = LinkDispatcher::new();
        let link = dispatcher
            .dispatch(
                "eclipse+mpc://marketplace.example.org/install/12345?mpc_state=abc",
                &CatalogRegistry::default(),
            )
            .expect("install link");
        assert!(link_catalog(&link).is_none());
        let implied = implied_catalog(&link).expect("implied");
        assert_eq!(implied.url.as_str(), "https://marketplace.example.org/");
    }

    #[test]
    fn only_implied_catalogs_are_flagged_anonymous() {
        let mut config = Config::default();
        config.marketplace.access_token = Some("secret".into());
        let registry = config.catalog_registry().expect("registry");
        let dispatcher = LinkDispatcher::new();

        let foreign = dispatcher
            .dispatch(
                "https://attacker.example.net/content/x?mpc_install=42",
                &registry,
            )
            .expect("install link");
        let (catalog, implied) =
            open_catalog(&registry, &config, &foreign, None).expect("catalog");
        assert!(implied);
        assert_eq!(catalog.url.host_str(), Some("attacker.example.net"));

        let (catalog, implied) = open_catalog(
            &registry,
            &config,
            &foreign,
            Some(mpc_core::config::DEFAULT_CATALOG_URL),
        )
        .expect("override");
        assert!(!implied);
        assert_eq!(catalog.url.as_str(), mpc_core::config::DEFAULT_CATALOG_URL);
    }

    #[test]
    fn cli_parses_global_catalog() {
        let cli = Cli::try_parse_from([
            "mpc",
            "search",
            "lsp",
            "--catalog",
            "https://marketplace.example.org/",
        ])
        .expect("args");
        assert_eq!(cli.catalog.as_deref(), Some("https://marketplace.example.org/"));
        assert!(matches!(cli.command, Command::Search(_)));
    }
}
