//! Coconut Catalog CLI - browse and manage the catalog from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Browse the built-in demo catalog
//! catalog-cli --demo products --collection "Bowls & Tableware" --sort price-low
//!
//! # Search the live catalog
//! catalog-cli products --search spoon
//!
//! # Add a product to an existing collection
//! catalog-cli add-product --name "Coconut Ladle" --price 12.99 --collection "Kitchen Accessories"
//!
//! # Follow remote changes until Ctrl+C
//! catalog-cli watch
//! ```
//!
//! # Commands
//!
//! - `products`, `product`, `collections`, `featured`, `stats`, `settings` - Queries
//! - `add-*`, `update-*`, `delete-*`, `set-hero`, `set-brand` - Mutations
//! - `watch` - Log every reconciled snapshot
//! - `deploy` - Trigger the build hook manually
//!
//! Without `--demo` the REST store is configured from `CATALOG_*` environment
//! variables (see `coconut_catalog::config`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use coconut_catalog_core::{
    BrandPatch, CollectionPatch, HeroProduct, NewCollection, NewProduct, Price, ProductPatch,
};

mod commands;

#[derive(Parser)]
#[command(name = "catalog-cli")]
#[command(author, version, about = "Coconut Catalog CLI tools")]
struct Cli {
    /// Use the built-in demo catalog instead of the remote store
    #[arg(long, global = true)]
    demo: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List products
    Products {
        /// Collection name, or "all"
        #[arg(short, long, default_value = "all")]
        collection: String,

        /// Search query (overrides the collection filter)
        #[arg(short, long, default_value = "")]
        search: String,

        /// Sort order (`name`, `price-low`, `price-high`, `newest`)
        #[arg(long, default_value = "name")]
        sort: String,
    },
    /// Show one product and related products
    Product {
        /// Product ID
        id: String,
    },
    /// List collections with product counts
    Collections {
        /// Filter by name or description
        #[arg(short, long, default_value = "")]
        search: String,
    },
    /// List featured products
    Featured,
    /// Show catalog statistics
    Stats,
    /// Show hero product and brand settings
    Settings,
    /// Create a collection
    AddCollection {
        #[arg(short, long)]
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(short, long, default_value = "")]
        image: String,
    },
    /// Update a collection's fields
    UpdateCollection {
        /// Collection ID
        id: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        image: Option<String>,
    },
    /// Delete a collection and its products
    DeleteCollection {
        /// Collection ID
        id: String,
    },
    /// Create a product
    AddProduct {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        price: Price,
        /// Collection name
        #[arg(short, long)]
        collection: String,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(short, long, default_value = "")]
        image: String,
        #[arg(short, long)]
        featured: bool,
    },
    /// Update a product's fields
    UpdateProduct {
        /// Product ID
        id: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        price: Option<Price>,
        /// Collection name
        #[arg(short, long)]
        collection: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        image: Option<String>,
        #[arg(short, long)]
        featured: Option<bool>,
    },
    /// Delete a product
    DeleteProduct {
        /// Product ID
        id: String,
    },
    /// Replace the hero banner
    SetHero {
        #[arg(short, long)]
        title: String,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(short, long, default_value = "")]
        image: String,
        #[arg(long, default_value = "Shop Now")]
        cta_text: String,
        #[arg(long, default_value = "/products")]
        cta_link: String,
        #[arg(short, long)]
        price: Option<Price>,
    },
    /// Update brand name and/or tagline
    SetBrand {
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        tagline: Option<String>,
    },
    /// Follow remote changes and log each new snapshot until Ctrl+C
    Watch,
    /// Trigger the build hook
    Deploy,
}

#[tokio::main]
async fn main() {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "coconut_catalog=info,catalog_cli=info".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    use commands::{manage, query, watch};

    let demo = cli.demo;
    match cli.command {
        Commands::Products {
            collection,
            search,
            sort,
        } => query::products(demo, collection, search, &sort).await?,
        Commands::Product { id } => query::product(demo, &id).await?,
        Commands::Collections { search } => query::collections(demo, &search).await?,
        Commands::Featured => query::featured(demo).await?,
        Commands::Stats => query::stats(demo).await?,
        Commands::Settings => query::settings(demo).await?,
        Commands::AddCollection {
            name,
            description,
            image,
        } => {
            manage::add_collection(demo, &NewCollection {
                name,
                description,
                image,
            })
            .await?;
        }
        Commands::UpdateCollection {
            id,
            name,
            description,
            image,
        } => {
            manage::update_collection(demo, &id, &CollectionPatch {
                name,
                description,
                image,
            })
            .await?;
        }
        Commands::DeleteCollection { id } => manage::delete_collection(demo, &id).await?,
        Commands::AddProduct {
            name,
            price,
            collection,
            description,
            image,
            featured,
        } => {
            manage::add_product(demo, &NewProduct {
                name,
                price,
                collection,
                description,
                image,
                featured,
            })
            .await?;
        }
        Commands::UpdateProduct {
            id,
            name,
            price,
            collection,
            description,
            image,
            featured,
        } => {
            manage::update_product(demo, &id, &ProductPatch {
                name,
                price,
                collection,
                description,
                image,
                featured,
            })
            .await?;
        }
        Commands::DeleteProduct { id } => manage::delete_product(demo, &id).await?,
        Commands::SetHero {
            title,
            description,
            image,
            cta_text,
            cta_link,
            price,
        } => {
            manage::set_hero(demo, HeroProduct {
                id: String::new(),
                title,
                description,
                image,
                cta_text,
                cta_link,
                price,
            })
            .await?;
        }
        Commands::SetBrand { name, tagline } => {
            manage::set_brand(demo, &BrandPatch {
                brand_name: name,
                tagline,
            })
            .await?;
        }
        Commands::Watch => watch::watch(demo).await?,
        Commands::Deploy => watch::deploy().await?,
    }
    Ok(())
}
