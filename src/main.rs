use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    process::ExitCode,
};

use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use log::info;

use fluxofin::{
    accounts::{AccountBook, AccountKind, MemoryAccountBook},
    errors::Error,
    goals::{Goal, GoalBook, MemoryGoalBook},
    insights, io,
    kpi::{self, Period},
    money::Cents,
    ops,
    split::{add_months, split},
    types::{MemoryTransactionStore, Transaction, TransactionKind, TransactionStore},
    validation::{PurchaseRequest, ValidationLimits},
};

/// Days ahead listed under upcoming bills in the report
const UPCOMING_DAYS: u64 = 30;
/// Categories listed in the report
const TOP_CATEGORIES: usize = 5;
/// Months of history in the report's cash flow table
const FLOW_MONTHS: u32 = 6;
/// Months averaged by the report's burn rate
const BURN_RATE_MONTHS: u32 = 3;

#[derive(Parser)]
#[command(version, about = "Personal finance ledger with installment tracking")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the installment schedule for a total as CSV
    Split {
        /// Total amount, e.g. 100.00 or 1.234,56
        total: Cents,
        /// Number of installments
        count: u32,
        /// Due date of the first installment (YYYY-MM-DD)
        first_due: NaiveDate,
    },
    /// Record a purchase or an income, optionally in installments
    Purchase(PurchaseArgs),
    /// Mark a transaction as paid
    Pay {
        #[command(flatten)]
        ledger: LedgerArgs,
        /// Transaction id
        id: u32,
    },
    /// Cancel the open installments of a purchase
    Cancel {
        #[command(flatten)]
        ledger: LedgerArgs,
        /// Id of the first installment
        parent: u32,
    },
    /// Delete a single transaction
    Delete {
        #[command(flatten)]
        ledger: LedgerArgs,
        /// Transaction id
        id: u32,
    },
    /// Mark late transactions overdue and summarize the current month
    Report {
        #[command(flatten)]
        ledger: LedgerArgs,
        /// Accounts CSV file, for balances and net worth
        #[arg(long)]
        accounts: Option<PathBuf>,
        /// Goals CSV file, for goal progress
        #[arg(long)]
        goals: Option<PathBuf>,
        /// Date to report on (YYYY-MM-DD); defaults to today
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Manage bank, credit and investment accounts
    Account {
        /// Accounts CSV file; created if missing
        #[arg(short, long)]
        accounts: PathBuf,
        #[command(subcommand)]
        command: AccountCommand,
    },
    /// Manage savings goals
    Goal {
        /// Goals CSV file; created if missing
        #[arg(short, long)]
        goals: PathBuf,
        #[command(subcommand)]
        command: GoalCommand,
    },
}

#[derive(Subcommand)]
enum AccountCommand {
    /// Open an account
    Add {
        #[arg(long)]
        name: String,
        /// checking, savings, credit or investment
        #[arg(long = "type")]
        kind: AccountKind,
        /// Current balance; negative for money owed
        #[arg(long, default_value_t = Cents::ZERO, allow_hyphen_values = true)]
        balance: Cents,
    },
    /// List accounts and their consolidated balance
    List,
    /// Replace an account's balance
    SetBalance {
        id: u32,
        #[arg(allow_hyphen_values = true)]
        balance: Cents,
    },
    /// Rename an account
    Rename { id: u32, name: String },
    /// Delete an account
    Remove { id: u32 },
}

#[derive(Subcommand)]
enum GoalCommand {
    /// Add a savings goal
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        category: String,
        #[arg(long)]
        target: Cents,
        /// Amount already saved
        #[arg(long, default_value_t = Cents::ZERO)]
        saved: Cents,
        #[arg(long)]
        deadline: NaiveDate,
    },
    /// Add to (or, when negative, withdraw from) a goal's saved amount
    Contribute {
        id: u32,
        #[arg(allow_hyphen_values = true)]
        amount: Cents,
    },
    /// Change a goal's target or deadline
    Update {
        id: u32,
        #[arg(long)]
        target: Option<Cents>,
        #[arg(long)]
        deadline: Option<NaiveDate>,
    },
    /// Show progress on every goal
    List {
        /// Date to measure the time left from; defaults to today
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Delete a goal
    Remove { id: u32 },
}

#[derive(Args)]
struct LedgerArgs {
    /// Ledger CSV file; created if missing
    #[arg(short, long)]
    ledger: PathBuf,
}

#[derive(Args)]
struct PurchaseArgs {
    #[command(flatten)]
    ledger: LedgerArgs,
    #[arg(long)]
    title: String,
    #[arg(long)]
    category: String,
    #[arg(long)]
    purchaser: Option<String>,
    /// Total amount, e.g. 100.00 or 1.234,56
    #[arg(long)]
    total: Cents,
    #[arg(short = 'n', long, default_value_t = 1)]
    installments: u32,
    /// Due date of the first installment; defaults to one month from today
    #[arg(long)]
    first_due: Option<NaiveDate>,
    /// Record an income instead of an expense
    #[arg(long)]
    income: bool,
    /// Warn above this many installments
    #[arg(long, default_value_t = ValidationLimits::default().max_installments)]
    max_installments: u32,
}

fn main() -> ExitCode {
    env_logger::init();
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("fluxofin: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Error> {
    match cli.command {
        Command::Split {
            total,
            count,
            first_due,
        } => {
            let installments = split(total, count, first_due)?;
            io::write_installments_to_csv(&mut std::io::stdout().lock(), &installments)
        }
        Command::Purchase(args) => {
            let mut store = load_ledger(&args.ledger.ledger)?;
            let first_due = match args.first_due {
                Some(date) => date,
                None => add_months(today(), 1)?,
            };
            let request = PurchaseRequest {
                kind: if args.income {
                    TransactionKind::Income
                } else {
                    TransactionKind::Expense
                },
                title: args.title,
                category: args.category,
                purchaser: args.purchaser,
                total: args.total,
                installments: args.installments,
                first_due,
            };
            let limits = ValidationLimits {
                max_installments: args.max_installments,
                ..ValidationLimits::default()
            };
            let ids = store.record(request, &limits)?;
            for id in &ids {
                println!("{id}");
            }
            save_ledger(&args.ledger.ledger, &store)
        }
        Command::Pay { ledger, id } => {
            let mut store = load_ledger(&ledger.ledger)?;
            ops::pay(&mut store, id.into())?;
            save_ledger(&ledger.ledger, &store)
        }
        Command::Cancel { ledger, parent } => {
            let mut store = load_ledger(&ledger.ledger)?;
            let cancelled = ops::cancel_group(&mut store, parent.into())?;
            println!("Cancelled {cancelled} installment(s)");
            save_ledger(&ledger.ledger, &store)
        }
        Command::Delete { ledger, id } => {
            let mut store = load_ledger(&ledger.ledger)?;
            let removed = store.remove(id.into())?;
            info!("Deleted {} ({})", removed.id(), removed.title());
            save_ledger(&ledger.ledger, &store)
        }
        Command::Report {
            ledger,
            accounts,
            goals,
            today: on,
        } => {
            let mut store = load_ledger(&ledger.ledger)?;
            let on = on.unwrap_or_else(today);
            ops::mark_overdue(&mut store, on)?;
            save_ledger(&ledger.ledger, &store)?;
            let accounts = accounts.as_deref().map(load_accounts).transpose()?;
            let goals = goals.as_deref().map(load_goals).transpose()?;
            print_report(&store, accounts.as_ref(), goals.as_ref(), on)
        }
        Command::Account { accounts, command } => run_account(&accounts, command),
        Command::Goal { goals, command } => run_goal(&goals, command),
    }
}

fn run_account(path: &Path, command: AccountCommand) -> Result<(), Error> {
    let mut book = load_accounts(path)?;
    match command {
        AccountCommand::Add {
            name,
            kind,
            balance,
        } => {
            println!("{}", book.open(&name, kind, balance)?);
        }
        AccountCommand::List => {
            for account in &book {
                println!(
                    "  {} {:<20} {:<10} {:>16}",
                    account.id(),
                    account.name(),
                    account.kind(),
                    account.balance().brl()
                );
            }
            println!("Total: {}", kpi::consolidated_balance(&book)?.brl());
            return Ok(());
        }
        AccountCommand::SetBalance { id, balance } => {
            book.account_mut(id.into())?
                .ok_or(Error::AccountNotFound(id.into()))?
                .set_balance(balance);
        }
        AccountCommand::Rename { id, name } => {
            book.account_mut(id.into())?
                .ok_or(Error::AccountNotFound(id.into()))?
                .rename(&name)?;
        }
        AccountCommand::Remove { id } => {
            let removed = book.remove(id.into())?;
            info!("Deleted {} ({})", removed.id(), removed.name());
        }
    }
    io::write_file_atomically(path, |writer| io::write_accounts_to_csv(writer, &book))
}

fn run_goal(path: &Path, command: GoalCommand) -> Result<(), Error> {
    let mut book = load_goals(path)?;
    match command {
        GoalCommand::Add {
            name,
            category,
            target,
            saved,
            deadline,
        } => {
            let goal = Goal::new(0.into(), &name, &category, target, saved, deadline)?;
            println!("{}", book.add(goal)?);
        }
        GoalCommand::Contribute { id, amount } => {
            book.goal_mut(id.into())?
                .ok_or(Error::GoalNotFound(id.into()))?
                .contribute(amount)?;
        }
        GoalCommand::Update {
            id,
            target,
            deadline,
        } => {
            let goal = book
                .goal_mut(id.into())?
                .ok_or(Error::GoalNotFound(id.into()))?;
            if let Some(target) = target {
                goal.set_target(target)?;
            }
            if let Some(deadline) = deadline {
                goal.set_deadline(deadline);
            }
        }
        GoalCommand::List { today: on } => {
            print_goals(&book, on.unwrap_or_else(today));
            return Ok(());
        }
        GoalCommand::Remove { id } => {
            let removed = book.remove(id.into())?;
            info!("Deleted {} ({})", removed.id(), removed.name());
        }
    }
    io::write_file_atomically(path, |writer| io::write_goals_to_csv(writer, &book))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Reads the ledger at `path`, or starts an empty one if the file does not exist yet
fn load_ledger(path: &Path) -> Result<MemoryTransactionStore, Error> {
    let mut store = MemoryTransactionStore::new();
    if !path.exists() {
        info!("No ledger at {}, starting empty", path.display());
        return Ok(store);
    }
    let mut reader = BufReader::new(File::open(path)?);
    io::load_transactions_from_csv(&mut reader, &mut store)?;
    Ok(store)
}

fn save_ledger(path: &Path, store: &MemoryTransactionStore) -> Result<(), Error> {
    io::write_file_atomically(path, |writer| io::write_transactions_to_csv(writer, store))
}

fn load_accounts(path: &Path) -> Result<MemoryAccountBook, Error> {
    let mut book = MemoryAccountBook::new();
    if path.exists() {
        io::load_accounts_from_csv(&mut BufReader::new(File::open(path)?), &mut book)?;
    }
    Ok(book)
}

fn load_goals(path: &Path) -> Result<MemoryGoalBook, Error> {
    let mut book = MemoryGoalBook::new();
    if path.exists() {
        io::load_goals_from_csv(&mut BufReader::new(File::open(path)?), &mut book)?;
    }
    Ok(book)
}

fn print_goals(book: &MemoryGoalBook, on: NaiveDate) {
    for goal in book {
        let months = goal.months_remaining(on);
        let time_left = if goal.is_reached() {
            "reached".to_string()
        } else if months == 0 {
            "deadline passed".to_string()
        } else {
            format!("{months} month(s) left")
        };
        println!(
            "  {} {:<20} {:>7} {:>16} to go, {}",
            goal.id(),
            goal.name(),
            format!("{:.1}%", goal.progress()),
            goal.remaining().brl(),
            time_left
        );
    }
}

fn print_report(
    store: &MemoryTransactionStore,
    accounts: Option<&MemoryAccountBook>,
    goals: Option<&MemoryGoalBook>,
    on: NaiveDate,
) -> Result<(), Error> {
    let transactions: Vec<Transaction> = store.into_iter().cloned().collect();
    let month = Period::month(on);
    let totals = kpi::totals(&transactions, &month)?;

    println!("Month {} to {}", month.start(), month.end());
    println!("  Income:   {}", totals.income.brl());
    println!("  Expenses: {}", totals.expenses.brl());
    println!("  Balance:  {}", totals.balance()?.brl());
    println!("  Savings rate: {:.1}%", kpi::savings_rate(&totals));
    println!(
        "  Outstanding installments: {}",
        kpi::outstanding_installments(&transactions)?.brl()
    );
    println!(
        "  Burn rate ({BURN_RATE_MONTHS} months): {}/month",
        kpi::burn_rate(&transactions, on, BURN_RATE_MONTHS)?.brl()
    );
    println!(
        "  Debt-to-income: {:.1}%",
        kpi::debt_to_income(&transactions, &month)?
    );

    if let Some(accounts) = accounts {
        println!("\nAccounts");
        println!("  Consolidated balance: {}", kpi::consolidated_balance(accounts)?.brl());
        println!("  Invested: {}", kpi::invested(accounts)?.brl());
        println!(
            "  Net worth: {}",
            kpi::net_worth(accounts, &transactions)?.brl()
        );
    }

    if let Some(goals) = goals {
        println!("\nGoals");
        print_goals(goals, on);
    }

    println!("\nTop categories");
    for share in kpi::category_breakdown(&transactions, &month, TOP_CATEGORIES)? {
        println!(
            "  {:<20} {:>16} {:>7}% ({})",
            share.category,
            share.amount.brl(),
            share.percentage,
            share.transactions
        );
    }

    println!("\nBy purchaser");
    for (purchaser, spent) in kpi::spending_by_purchaser(&transactions, &month)? {
        println!("  {:<20} {:>16}", purchaser, spent.brl());
    }

    println!("\nLast {FLOW_MONTHS} months");
    for flow in kpi::monthly_flows(&transactions, on, FLOW_MONTHS)? {
        println!(
            "  {} in {:>16} out {:>16} balance {:>16}",
            flow.month.format("%Y-%m"),
            flow.totals.income.brl(),
            flow.totals.expenses.brl(),
            flow.totals.balance()?.brl()
        );
    }

    println!("\nDue in the next {UPCOMING_DAYS} days");
    for bill in kpi::upcoming(&transactions, on, UPCOMING_DAYS) {
        let position = bill
            .installment()
            .map(|(number, of)| format!(" {number}/{of}"))
            .unwrap_or_default();
        println!(
            "  {} {} {}{} {} [{}]",
            bill.date(),
            bill.id(),
            bill.title(),
            position,
            bill.amount().brl(),
            bill.status()
        );
    }

    println!("\nInsights");
    for insight in insights::generate(&transactions, on)? {
        println!("  [{:?}] {}: {}", insight.kind, insight.title, insight.message);
    }
    Ok(())
}
