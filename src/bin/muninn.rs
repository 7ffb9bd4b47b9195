//! muninn: book API client
//!
//! Fetches books through the observable cache; `--watch` keeps a
//! subscription open and prints each refresh as it settles.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use muninn::{Book, BookCache, BookId, Config, CreateBook, Observable};

/// Muninn CLI client
#[derive(Parser)]
#[command(name = "muninn")]
#[command(version = muninn::PKG_VERSION)]
#[command(about = "Observable book API client")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// API base URL (overrides the configuration file)
    #[arg(short, long, env = "MUNINN_BASE_URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List all books
    List {
        /// Print this many refreshes instead of a single snapshot
        #[arg(short, long)]
        watch: Option<usize>,
    },

    /// Show one book
    Get {
        /// Book id (UUID)
        id: BookId,
        /// Print this many refreshes instead of a single snapshot
        #[arg(short, long)]
        watch: Option<usize>,
    },

    /// Create a book
    Create {
        /// Title
        #[arg(short, long)]
        name: String,
        /// Number of copies
        #[arg(short, long)]
        amount: i32,
    },

    /// Update a book
    Update {
        /// Book id (UUID)
        id: BookId,
        /// Title
        #[arg(short, long)]
        name: String,
        /// Number of copies
        #[arg(short, long)]
        amount: i32,
    },

    /// Delete a book
    Delete {
        /// Book id (UUID)
        id: BookId,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let mut config = match args.config.as_deref() {
        Some(path) => Config::load(Some(path))?,
        None => Config::load(None).unwrap_or_default(),
    };
    if let Some(base_url) = args.base_url {
        config.transport.base_url = base_url;
    }

    let books = BookCache::from_config(&config)?;

    match args.command {
        Command::List { watch: None } => {
            let all = books.collection().current().await?;
            print_books(&all);
        }

        Command::List { watch: Some(count) } => {
            watch(books.collection(), count, |all| print_books(all)).await;
        }

        Command::Get { id, watch: None } => {
            let book = books.by_key(&id).current().await?;
            print_book(&book);
        }

        Command::Get {
            id,
            watch: Some(count),
        } => {
            watch(books.by_key(&id), count, print_book).await;
        }

        Command::Create { name, amount } => {
            let book = books.create(CreateBook::new(name, amount)).current().await?;
            println!("created {}", book.id);
            print_book(&book);
        }

        Command::Update { id, name, amount } => {
            let book = books
                .update_by_key(&id, CreateBook::new(name, amount))
                .current()
                .await?;
            print_book(&book);
        }

        Command::Delete { id } => {
            books.delete_by_key(&id).current().await?;
            println!("deleted {id}");
        }
    }

    Ok(())
}

/// Subscribe and print `count` settled refreshes.
async fn watch<T, F>(observable: Observable<T>, count: usize, render: F)
where
    T: Clone + Send + Sync + 'static,
    F: Fn(&T),
{
    let mut stream = observable.stream();
    for _ in 0..count {
        let Some(pending) = stream.next().await else {
            break;
        };
        let generation = pending.generation();
        let origin = pending.origin().as_str();
        match pending.await {
            Ok(value) => {
                println!("--- #{generation} ({origin})");
                render(&value);
            }
            Err(e) => println!("--- #{generation} ({origin}) error: {e}"),
        }
    }
}

fn print_books(books: &[Book]) {
    if books.is_empty() {
        println!("no books");
    }
    for book in books {
        print_book(book);
    }
}

fn print_book(book: &Book) {
    println!("{}  {} (x{})", book.id, book.title, book.amount);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    const ID: &str = "6f1c2d9e-2b7a-4c53-9a59-2f3f3e1b8d10";

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("muninn").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn command_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn list_with_and_without_watch() {
        assert!(matches!(parse(&["list"]).command, Command::List { watch: None }));
        assert!(matches!(
            parse(&["list", "--watch", "3"]).command,
            Command::List { watch: Some(3) }
        ));
    }

    #[test]
    fn get_parses_book_id() {
        match parse(&["get", ID, "-w", "2"]).command {
            Command::Get { id, watch } => {
                assert_eq!(id.to_string(), ID);
                assert_eq!(watch, Some(2));
            }
            _ => panic!("expected get"),
        }
        assert!(Args::try_parse_from(["muninn", "get", "not-a-uuid"]).is_err());
    }

    #[test]
    fn create_and_update_take_name_and_amount() {
        match parse(&["create", "--name", "Edda", "--amount", "2"]).command {
            Command::Create { name, amount } => {
                assert_eq!(name, "Edda");
                assert_eq!(amount, 2);
            }
            _ => panic!("expected create"),
        }
        match parse(&["update", ID, "-n", "Poetic Edda", "-a", "4"]).command {
            Command::Update { id, name, amount } => {
                assert_eq!(id.to_string(), ID);
                assert_eq!(name, "Poetic Edda");
                assert_eq!(amount, 4);
            }
            _ => panic!("expected update"),
        }
        assert!(Args::try_parse_from(["muninn", "create", "--name", "Edda"]).is_err());
    }

    #[test]
    fn global_options_before_subcommand() {
        let args = parse(&["--config", "/tmp/m.toml", "--base-url", "http://x", "delete", ID]);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/m.toml")));
        assert_eq!(args.base_url.as_deref(), Some("http://x"));
        assert!(matches!(args.command, Command::Delete { .. }));
    }
}
