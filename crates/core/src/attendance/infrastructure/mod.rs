pub mod csv_ledger_file;
