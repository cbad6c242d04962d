//! Helpers for reading and writing ledgers and installment schedules as CSV

use std::{
    fs::File,
    io::{BufWriter, Read, Write},
    path::Path,
};

use csv::Trim;
use log::debug;
use tempfile::NamedTempFile;

use crate::{
    accounts::{Account, AccountBook},
    errors::Error,
    goals::{Goal, GoalBook},
    split::Installment,
    types::{Transaction, TransactionStore},
    validation::check_record,
};

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader)
}

/// Loads transactions from a CSV-formatted file stream into the supplied [`TransactionStore`].
///
/// Expects input data in this format (including header), as produced by
/// [`write_transactions_to_csv`]:
/// ```csv
/// id, type,    title,     category, purchaser, amount, date,       status,  parent, installment_number, total_installments
/// 1,  expense, Geladeira, Casa,     Ana,       33.34,  2024-01-31, paid,    1,      1,                  3
/// 2,  expense, Geladeira, Casa,     Ana,       33.33,  2024-02-29, pending, 1,      2,                  3
/// 4,  income,  Salário,   Trabalho, ,          5000,   2024-02-05, paid,    ,       ,
/// ```
/// # Errors
/// [`Error::Load`] for unreadable rows, [`Error::InvalidArgument`] for rows that fail
/// [`check_record`], [`Error::Duplicate`] if an id repeats or is already in the store.
/// Rows before the failing one stay registered.
pub fn load_transactions_from_csv<R, S>(reader: &mut R, store: &mut S) -> Result<(), Error>
where
    R: Read,
    S: TransactionStore,
    for<'a> &'a S: IntoIterator<Item = &'a Transaction>,
{
    let mut loaded = 0_usize;
    for record in csv_reader(reader).deserialize() {
        let transaction: Transaction = record?;
        check_record(&transaction)?;
        store.register(transaction)?;
        loaded += 1;
    }
    debug!("Loaded {loaded} transaction(s)");
    Ok(())
}

/// Outputs every transaction in the store to CSV, in the store's iteration order.
///
/// See [`load_transactions_from_csv`] for the format.
pub fn write_transactions_to_csv<W, S>(writer: &mut W, store: &S) -> Result<(), Error>
where
    W: Write,
    for<'a> &'a S: IntoIterator<Item = &'a Transaction>,
{
    let mut csv_writer = csv::Writer::from_writer(writer);
    for transaction in store {
        csv_writer.serialize(transaction)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Loads accounts into the supplied [`AccountBook`].
///
/// Expects a header and one account per row:
/// ```csv
/// id, name,    type,     balance
/// 1,  Nubank,  checking, 2500.00
/// 2,  Cartão,  credit,   -800.00
/// ```
/// # Errors
/// [`Error::Load`] for unreadable rows, [`Error::InvalidArgument`] for a blank name,
/// [`Error::DuplicateAccount`] if an id repeats
pub fn load_accounts_from_csv<R, B>(reader: &mut R, book: &mut B) -> Result<(), Error>
where
    R: Read,
    B: AccountBook,
    for<'a> &'a B: IntoIterator<Item = &'a Account>,
{
    let mut loaded = 0_usize;
    for record in csv_reader(reader).deserialize() {
        let account: Account = record?;
        book.insert(Account::new(
            account.id(),
            account.name(),
            account.kind(),
            account.balance(),
        )?)?;
        loaded += 1;
    }
    debug!("Loaded {loaded} account(s)");
    Ok(())
}

/// Outputs every account to CSV; see [`load_accounts_from_csv`] for the format
pub fn write_accounts_to_csv<W, B>(writer: &mut W, book: &B) -> Result<(), Error>
where
    W: Write,
    for<'a> &'a B: IntoIterator<Item = &'a Account>,
{
    let mut csv_writer = csv::Writer::from_writer(writer);
    for account in book {
        csv_writer.serialize(account)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Loads goals into the supplied [`GoalBook`].
///
/// Expects a header and one goal per row:
/// ```csv
/// id, name,   category, target_amount, current_amount, deadline
/// 1,  Viagem, Lazer,    10000.00,      2500.00,        2024-12-20
/// ```
/// # Errors
/// [`Error::Load`] for unreadable rows, [`Error::InvalidArgument`] for goals
/// [`Goal::new`] rejects, [`Error::DuplicateGoal`] if an id repeats
pub fn load_goals_from_csv<R, B>(reader: &mut R, book: &mut B) -> Result<(), Error>
where
    R: Read,
    B: GoalBook,
    for<'a> &'a B: IntoIterator<Item = &'a Goal>,
{
    let mut loaded = 0_usize;
    for record in csv_reader(reader).deserialize() {
        let goal: Goal = record?;
        book.insert(Goal::new(
            goal.id(),
            goal.name(),
            goal.category(),
            goal.target_amount(),
            goal.current_amount(),
            goal.deadline(),
        )?)?;
        loaded += 1;
    }
    debug!("Loaded {loaded} goal(s)");
    Ok(())
}

/// Outputs every goal to CSV; see [`load_goals_from_csv`] for the format
pub fn write_goals_to_csv<W, B>(writer: &mut W, book: &B) -> Result<(), Error>
where
    W: Write,
    for<'a> &'a B: IntoIterator<Item = &'a Goal>,
{
    let mut csv_writer = csv::Writer::from_writer(writer);
    for goal in book {
        csv_writer.serialize(goal)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Replaces the file at `path` with whatever `write` produces.
///
/// The content goes to a temporary file in the same directory, which is renamed over `path`
/// only once `write` succeeded and the data is flushed to disk. On any error the previous file
/// is left as it was and the temporary file is removed.
pub fn write_file_atomically<F>(path: &Path, write: F) -> Result<(), Error>
where
    F: FnOnce(&mut BufWriter<&mut File>) -> Result<(), Error>,
{
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(directory)?;
    {
        let mut writer = BufWriter::new(file.as_file_mut());
        write(&mut writer)?;
        writer.flush()?;
    }
    file.as_file().sync_all()?;
    file.persist(path).map_err(|err| err.error)?;
    debug!("Wrote {}", path.display());
    Ok(())
}

/// Outputs an installment schedule to CSV.
///
/// Output data will be in the form:
/// ```csv
/// installment,of,due_date,amount
/// 1,3,2024-01-31,33.34
/// 2,3,2024-02-29,33.33
/// 3,3,2024-03-31,33.33
/// ```
pub fn write_installments_to_csv<W>(writer: &mut W, installments: &[Installment]) -> Result<(), Error>
where
    W: Write,
{
    let mut csv_writer = csv::Writer::from_writer(writer);
    for installment in installments {
        csv_writer.serialize(installment)?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use chrono::NaiveDate;
    use tempfile::tempdir;

    use crate::{
        accounts::{AccountKind, MemoryAccountBook},
        goals::{GoalId, MemoryGoalBook},
        money::Cents,
        split::split,
        types::{MemoryTransactionStore, Status, TransactionId, TransactionKind},
        validation::{PurchaseRequest, ValidationLimits},
    };

    use super::*;

    const TEST_INPUT_CSV: &[u8] = b"id, type,    title,     category, purchaser, amount, date,       status,  parent, installment_number, total_installments
1,  expense, Geladeira, Casa,     Ana,       33.34,  2024-01-31, paid,    1,      1,                  3
2,  expense, Geladeira, Casa,     Ana,       33.33,  2024-02-29, pending, 1,      2,                  3
3,  expense, Geladeira, Casa,     Ana,       33.33,  2024-03-31, pending, 1,      3,                  3
4,  income,  Sal\xc3\xa1rio,   Trabalho, ,          5000,   2024-02-05, paid,    ,       ,
";

    #[test]
    fn test_read_with_whitespace_and_empty_fields() {
        let mut store = MemoryTransactionStore::new();
        let mut cursor = Cursor::new(TEST_INPUT_CSV);
        load_transactions_from_csv(&mut cursor, &mut store).unwrap();
        assert_eq!(store.len(), 4);

        let installment = store.transaction(2.into()).unwrap().unwrap();
        assert_eq!(installment.amount(), Cents::from(3333));
        assert_eq!(installment.status(), Status::Pending);
        assert_eq!(installment.parent(), Some(TransactionId::from(1)));
        assert_eq!(installment.installment(), Some((2, 3)));
        assert_eq!(installment.purchaser(), Some("Ana"));

        let salary = store.transaction(4.into()).unwrap().unwrap();
        assert_eq!(salary.kind(), TransactionKind::Income);
        assert_eq!(salary.title(), "Salário");
        assert_eq!(salary.amount(), Cents::from(500000));
        assert_eq!(salary.purchaser(), None);
        assert_eq!(salary.parent(), None);
        assert_eq!(salary.installment(), None);
    }

    #[test]
    fn test_read_rejects_duplicate_ids() {
        let input = b"id,type,title,category,purchaser,amount,date,status,parent,installment_number,total_installments
1,expense,Padaria,Mercado,,12.50,2024-03-05,pending,,,
1,expense,Padaria,Mercado,,12.50,2024-03-06,pending,,,
";
        let mut store = MemoryTransactionStore::new();
        let result = load_transactions_from_csv(&mut Cursor::new(&input[..]), &mut store);
        assert!(matches!(result, Err(Error::Duplicate(_))));
    }

    #[test]
    fn test_read_rejects_bad_amount() {
        let input = b"id,type,title,category,purchaser,amount,date,status,parent,installment_number,total_installments
1,expense,Padaria,Mercado,,doze,2024-03-05,pending,,,
";
        let mut store = MemoryTransactionStore::new();
        let result = load_transactions_from_csv(&mut Cursor::new(&input[..]), &mut store);
        assert!(matches!(result, Err(Error::Load(_))));
    }

    const HEADER: &str =
        "id,type,title,category,purchaser,amount,date,status,parent,installment_number,total_installments";

    fn load_rows(rows: &str) -> (MemoryTransactionStore, Result<(), Error>) {
        let input = format!("{HEADER}\n{rows}");
        let mut store = MemoryTransactionStore::new();
        let result = load_transactions_from_csv(&mut Cursor::new(input.as_bytes()), &mut store);
        (store, result)
    }

    #[test]
    fn test_read_rejects_negative_amount() {
        let (store, result) = load_rows(
            "1,expense,Padaria,Mercado,,12.50,2024-03-05,pending,,,\n\
             2,expense,A,Casa,,-500.00,2024-03-05,pending,,,\n",
        );
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
        assert!(store.transaction(2.into()).unwrap().is_none());
    }

    #[test]
    fn test_read_rejects_partial_installment_fields() {
        for row in [
            "1,expense,A,Casa,,5.00,2024-03-05,pending,,7,",
            "1,expense,A,Casa,,5.00,2024-03-05,pending,1,,",
            "1,expense,A,Casa,,5.00,2024-03-05,pending,,1,3",
            "1,expense,A,Casa,,5.00,2024-03-05,pending,1,1,",
        ] {
            let (store, result) = load_rows(row);
            assert!(matches!(result, Err(Error::InvalidArgument(_))), "{row}");
            assert!(store.is_empty());
        }
    }

    #[test]
    fn test_read_rejects_installment_out_of_range() {
        for row in [
            "1,expense,A,Casa,,5.00,2024-03-05,pending,1,4,3",
            "1,expense,A,Casa,,5.00,2024-03-05,pending,1,0,3",
            "1,expense,A,Casa,,5.00,2024-03-05,pending,1,0,0",
        ] {
            let (store, result) = load_rows(row);
            assert!(matches!(result, Err(Error::InvalidArgument(_))), "{row}");
            assert!(store.is_empty());
        }
    }

    #[test]
    fn test_read_rejects_extra_decimals() {
        let (store, result) = load_rows("1,expense,A,Casa,,10.999,2024-03-05,pending,,,");
        assert!(matches!(result, Err(Error::Load(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_write_then_reload_ledger() {
        let mut store = MemoryTransactionStore::new();
        store
            .record(
                PurchaseRequest {
                    kind: TransactionKind::Expense,
                    title: "Sofá".into(),
                    category: "Casa".into(),
                    purchaser: None,
                    total: Cents::from(200000),
                    installments: 3,
                    first_due: NaiveDate::from_ymd_opt(2024, 4, 10).unwrap(),
                },
                &ValidationLimits::default(),
            )
            .unwrap();
        let mut output = vec![];
        write_transactions_to_csv(&mut output, &store).unwrap();

        let text = String::from_utf8(output.clone()).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("id,type,title,category,purchaser,amount,date,status,parent,installment_number,total_installments")
        );
        assert_eq!(
            lines.next(),
            Some("1,expense,Sofá,Casa,,666.68,2024-04-10,pending,1,1,3")
        );

        let mut reloaded = MemoryTransactionStore::new();
        load_transactions_from_csv(&mut Cursor::new(&output), &mut reloaded).unwrap();
        let original: Vec<&Transaction> = (&store).into_iter().collect();
        let copy: Vec<&Transaction> = (&reloaded).into_iter().collect();
        assert_eq!(original, copy);
    }

    #[test]
    fn test_write_installments() {
        let installments = split(
            Cents::from(10000),
            3,
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
        .unwrap();
        let mut output = vec![];
        write_installments_to_csv(&mut output, &installments).unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "installment,of,due_date,amount\n1,3,2024-01-31,33.34\n2,3,2024-02-29,33.33\n3,3,2024-03-31,33.33\n"
        );
    }

    #[test]
    fn test_accounts_round_trip() {
        let input = b"id, name,   type,       balance
1,  Nubank, checking,   2500.00
2,  Cart\xc3\xa3o, credit,   -800
";
        let mut book = MemoryAccountBook::new();
        load_accounts_from_csv(&mut Cursor::new(&input[..]), &mut book).unwrap();
        assert_eq!(book.len(), 2);
        let card = book.account(2.into()).unwrap().unwrap();
        assert_eq!(card.name(), "Cartão");
        assert_eq!(card.kind(), AccountKind::Credit);
        assert_eq!(card.balance(), Cents::from(-80000));

        let mut output = vec![];
        write_accounts_to_csv(&mut output, &book).unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "id,name,type,balance\n1,Nubank,checking,2500.00\n2,Cartão,credit,-800.00\n"
        );
    }

    #[test]
    fn test_read_accounts_rejects_bad_rows() {
        let blank = b"id,name,type,balance\n1, ,checking,1.00\n";
        let mut book = MemoryAccountBook::new();
        let result = load_accounts_from_csv(&mut Cursor::new(&blank[..]), &mut book);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));

        let unknown = b"id,name,type,balance\n1,Conta,wallet,1.00\n";
        let result = load_accounts_from_csv(&mut Cursor::new(&unknown[..]), &mut book);
        assert!(matches!(result, Err(Error::Load(_))));
        assert!(book.is_empty());
    }

    #[test]
    fn test_goals_round_trip() {
        let input = b"id, name,   category, target_amount, current_amount, deadline
3,  Viagem, Lazer,    10000.00,      2500.00,        2024-12-20
";
        let mut book = MemoryGoalBook::new();
        load_goals_from_csv(&mut Cursor::new(&input[..]), &mut book).unwrap();
        let goal = book.goal(GoalId::from(3)).unwrap().unwrap();
        assert_eq!(goal.target_amount(), Cents::from(1000000));
        assert_eq!(goal.remaining(), Cents::from(750000));

        let mut output = vec![];
        write_goals_to_csv(&mut output, &book).unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "id,name,category,target_amount,current_amount,deadline\n3,Viagem,Lazer,10000.00,2500.00,2024-12-20\n"
        );

        let zero_target = b"id,name,category,target_amount,current_amount,deadline\n1,Carro,,0,0,2025-01-01\n";
        let mut book = MemoryGoalBook::new();
        let result = load_goals_from_csv(&mut Cursor::new(&zero_target[..]), &mut book);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_write_file_atomically() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.csv");
        write_file_atomically(&path, |writer| {
            writer.write_all(b"first")?;
            Ok(())
        })
        .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first");

        let result = write_file_atomically(&path, |writer| {
            writer.write_all(b"partial")?;
            Err(Error::InvalidArgument("stop".into()))
        });
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        write_file_atomically(&path, |writer| write_transactions_to_csv(writer, &MemoryTransactionStore::new()))
            .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
