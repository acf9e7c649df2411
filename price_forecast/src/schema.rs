//! Diesel schema for the historical price store.

// Hand-maintained: the column names follow the ingestion job's DataFrame
// headers, hence the quoted mixed-case SQL names.

diesel::table! {
    stock_data (stock_symbol, date) {
        stock_symbol -> Nullable<Text>,
        #[sql_name = "Date"]
        date -> Nullable<Text>,
        #[sql_name = "Close"]
        close -> Nullable<Double>,
    }
}
