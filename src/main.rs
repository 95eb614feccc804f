use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use relmap::config::ReaderConfig;
use relmap::connection::ClickHouseConnection;
use relmap::dialect::{self, SqlDialect};
use relmap::filters::SortDirection;
use relmap::mapping_catalog::{MappingCatalog, MappingCatalogConfig};
use relmap::proposition::PropositionKind;
use relmap::reader::PropositionReader;
use relmap::sql_generator::{QueryBuilder, QueryRequest};

/// relmap - read clinical propositions out of relational databases
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// YAML file with the entity mappings
    #[arg(long)]
    mapping: PathBuf,

    /// SQL dialect to generate
    #[arg(long, default_value = "clickhouse")]
    dialect: String,

    /// Which kind of proposition to read
    #[arg(long, value_enum)]
    kind: Kind,

    /// Proposition ids to read (repeatable)
    #[arg(long = "prop-id", required = true)]
    prop_ids: Vec<String>,

    /// Restrict to these key ids (repeatable)
    #[arg(long = "key-id")]
    key_ids: Vec<String>,

    /// Order rows by start time
    #[arg(long, value_enum)]
    order: Option<Order>,

    /// Run the statements against ClickHouse instead of printing them
    #[arg(long)]
    execute: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Constants,
    PrimitiveParameters,
    Events,
}

impl From<Kind> for PropositionKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Constants => PropositionKind::Constant,
            Kind::PrimitiveParameters => PropositionKind::PrimitiveParameter,
            Kind::Events => PropositionKind::Event,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Order {
    Asc,
    Desc,
}

impl From<Order> for SortDirection {
    fn from(order: Order) -> Self {
        match order {
            Order::Asc => SortDirection::Ascending,
            Order::Desc => SortDirection::Descending,
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Defaults to INFO level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let catalog = MappingCatalogConfig::from_yaml_file(&cli.mapping)
        .and_then(|config| config.to_catalog())
        .with_context(|| format!("loading mappings from {}", cli.mapping.display()))?;
    let dialect = dialect::for_name(&cli.dialect)?;
    let config = ReaderConfig::from_env().context("reading RELMAP_* settings")?;
    let proposition_ids: BTreeSet<String> = cli.prop_ids.iter().cloned().collect();
    let order = cli.order.map(SortDirection::from);

    if cli.execute {
        execute(catalog, dialect, config, &cli, &proposition_ids, order)
    } else {
        print_statements(&catalog, dialect.as_ref(), &config, &cli, &proposition_ids, order)
    }
}

fn print_statements(
    catalog: &MappingCatalog,
    dialect: &dyn SqlDialect,
    config: &ReaderConfig,
    cli: &Cli,
    proposition_ids: &BTreeSet<String>,
    order: Option<SortDirection>,
) -> anyhow::Result<()> {
    let builder = QueryBuilder::new(dialect, catalog);
    let groups = catalog.group_by_entity(cli.kind.into(), proposition_ids);
    if groups.is_empty() {
        log::warn!("No mapping produces the requested proposition ids");
    }
    for (entity, ids) in groups {
        let request = QueryRequest {
            entity: &entity,
            proposition_ids: &ids,
            key_ids: &cli.key_ids,
            filters: &[],
            order,
            row_limit: config.row_limit,
        };
        let query = builder.build_primary(&request)?;
        println!("-- {}\n{};", entity.name, query.sql);
        if config.row_limit.is_some() {
            continue;
        }
        for reference in &entity.references {
            let reference_request = QueryRequest {
                order: None,
                row_limit: None,
                ..request
            };
            let query = builder.build_reference(&reference_request, &reference.name)?;
            println!("-- {} -> {}\n{};", entity.name, reference.name, query.sql);
        }
    }
    Ok(())
}

fn execute(
    catalog: MappingCatalog,
    dialect: Arc<dyn SqlDialect>,
    config: ReaderConfig,
    cli: &Cli,
    proposition_ids: &BTreeSet<String>,
    order: Option<SortDirection>,
) -> anyhow::Result<()> {
    let connection = ClickHouseConnection::from_env()?;
    let mut reader = PropositionReader::connect(Arc::new(catalog), connection, [dialect], config)?;
    let result = match cli.kind {
        Kind::Constants => reader.read_constants(&cli.key_ids, proposition_ids, &[])?,
        Kind::PrimitiveParameters => {
            reader.read_primitive_parameters(&cli.key_ids, proposition_ids, &[], order)?
        }
        Kind::Events => reader.read_events(&cli.key_ids, proposition_ids, &[], order)?,
    };
    log::info!("Read propositions for {} keys", result.len());
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
