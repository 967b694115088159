//! fintree CLI - category tree administration

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use fintree::{
    CategoryNode, CategoryPatch, CategoryService, NewCategory, SqliteLedger, SqliteStore,
    TenantId,
};

#[derive(Parser)]
#[command(name = "fintree")]
#[command(about = "Tenant-scoped hierarchical category engine", long_about = None)]
struct Cli {
    /// Database file
    #[arg(short, long, default_value = "fintree.db")]
    database: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database file
    Init,

    /// Create a category
    Add {
        /// Tenant (household) id
        tenant: TenantId,
        /// Category name
        name: String,
        /// Parent category id (omit for a root)
        #[arg(short, long)]
        parent: Option<i64>,
        /// Optional description
        #[arg(long)]
        description: Option<String>,
    },

    /// Print the category tree for a tenant
    Tree { tenant: TenantId },

    /// Show one category with its relations
    Show {
        tenant: TenantId,
        id: i64,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Move a category under a new parent (or make it a root)
    Move {
        tenant: TenantId,
        id: i64,
        /// New parent id
        #[arg(short, long, conflicts_with = "root")]
        parent: Option<i64>,
        /// Make the category a root
        #[arg(long)]
        root: bool,
    },

    /// Rename a category
    Rename {
        tenant: TenantId,
        id: i64,
        name: String,
    },

    /// Soft-delete a category
    Rm { tenant: TenantId, id: i64 },

    /// Print the root-first path to a category
    Path { tenant: TenantId, id: i64 },

    /// Print subtree transaction statistics
    Stats {
        tenant: TenantId,
        id: i64,
        #[arg(long)]
        json: bool,
    },

    /// Record a demo transaction against a category
    Spend {
        tenant: TenantId,
        category: i64,
        /// Amount in minor units (cents); may be negative
        #[arg(allow_negative_numbers = true)]
        amount_cents: i64,
        #[arg(long)]
        note: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let service = open_service(&cli.database)?;

    match cli.command {
        Commands::Init => {
            println!("Initialized database at {:?}", cli.database);
            Ok(())
        }
        Commands::Add {
            tenant,
            name,
            parent,
            description,
        } => {
            let mut new = match parent {
                Some(p) => NewCategory::child_of(p, name),
                None => NewCategory::root(name),
            };
            new.description = description;
            let created = service.create(tenant, new).with_suggestion()?;
            println!("Created category {} '{}'", created.category.id, created.category.name);
            Ok(())
        }
        Commands::Tree { tenant } => {
            let roots = service.find_all(tenant)?;
            if roots.is_empty() {
                println!("(no categories)");
            }
            for root in &roots {
                print_node(root, 0);
            }
            Ok(())
        }
        Commands::Show { tenant, id, json } => {
            let detail = service.find_one(tenant, id).with_suggestion()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&detail)?);
            } else {
                let cat = &detail.category;
                println!("#{} {}", cat.id, cat.name);
                if let Some(desc) = &cat.description {
                    println!("  description: {desc}");
                }
                match &detail.parent {
                    Some(p) => println!("  parent: #{} {}", p.id, p.name),
                    None => println!("  parent: (root)"),
                }
                println!("  children: {}", detail.children.len());
                for child in &detail.children {
                    println!("    #{} {}", child.id, child.name);
                }
                println!("  recent transactions: {}", detail.recent_transactions.len());
                for tx in &detail.recent_transactions {
                    println!(
                        "    #{} {} {}",
                        tx.id,
                        format_cents(tx.amount_cents),
                        tx.note.as_deref().unwrap_or("")
                    );
                }
            }
            Ok(())
        }
        Commands::Move {
            tenant,
            id,
            parent,
            root,
        } => {
            if parent.is_none() && !root {
                anyhow::bail!("specify --parent <id> or --root");
            }
            let patch = CategoryPatch::reparent(if root { None } else { parent });
            let updated = service.update(tenant, id, patch).with_suggestion()?;
            match updated.category.parent_id {
                Some(p) => println!("Moved category {id} under {p}"),
                None => println!("Category {id} is now a root"),
            }
            Ok(())
        }
        Commands::Rename { tenant, id, name } => {
            let updated = service
                .update(tenant, id, CategoryPatch::rename(name))
                .with_suggestion()?;
            println!("Renamed category {} to '{}'", id, updated.category.name);
            Ok(())
        }
        Commands::Rm { tenant, id } => {
            service.remove(tenant, id).with_suggestion()?;
            println!("Deleted category {id}");
            Ok(())
        }
        Commands::Path { tenant, id } => {
            let path = service.category_path(tenant, id).with_suggestion()?;
            let names: Vec<String> = path
                .iter()
                .map(|c| format!("{} (#{})", c.name, c.id))
                .collect();
            println!("{}", names.join(" > "));
            Ok(())
        }
        Commands::Stats { tenant, id, json } => {
            let stats = service.category_stats(tenant, id).with_suggestion()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Category {id}");
                println!(
                    "  direct:      {:>4} transactions, {}",
                    stats.direct_transactions,
                    format_cents(stats.direct_amount_cents)
                );
                println!(
                    "  descendants: {:>4} transactions, {} (across {} categories)",
                    stats.descendant_transactions,
                    format_cents(stats.descendant_amount_cents),
                    stats.children_count
                );
                println!(
                    "  total:       {:>4} transactions, {}",
                    stats.total_transactions,
                    format_cents(stats.total_amount_cents)
                );
            }
            Ok(())
        }
        Commands::Spend {
            tenant,
            category,
            amount_cents,
            note,
        } => {
            // Make sure the category exists for this tenant before booking.
            service.find_one(tenant, category).with_suggestion()?;
            let ledger = SqliteLedger::open(&cli.database)?;
            let tx = ledger.record(category, amount_cents, note.as_deref())?;
            println!(
                "Recorded transaction {} of {} on category {}",
                tx,
                format_cents(amount_cents),
                category
            );
            Ok(())
        }
    }
}

fn open_service(path: &PathBuf) -> anyhow::Result<CategoryService<SqliteStore, SqliteLedger>> {
    let store = SqliteStore::open(path)
        .with_context(|| format!("failed to open category store at {path:?}"))?;
    let ledger = SqliteLedger::open(path)
        .with_context(|| format!("failed to open ledger at {path:?}"))?;
    Ok(CategoryService::new(store, ledger))
}

fn print_node(node: &CategoryNode, indent: usize) {
    println!(
        "{}#{} {}",
        "  ".repeat(indent),
        node.category.id,
        node.category.name
    );
    for child in &node.children {
        print_node(child, indent + 1);
    }
}

fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

/// Attach the engine's suggestion (if any) to a failed operation
trait WithSuggestion<T> {
    fn with_suggestion(self) -> anyhow::Result<T>;
}

impl<T> WithSuggestion<T> for fintree::Result<T> {
    fn with_suggestion(self) -> anyhow::Result<T> {
        self.map_err(|err| match err.suggestion() {
            Some(hint) => anyhow::anyhow!("{err} (hint: {hint})"),
            None => anyhow::Error::new(err),
        })
    }
}
