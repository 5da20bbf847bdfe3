//! Property-based tests for the CRUD facade
//!
//! These tests verify, for arbitrary inputs, that:
//! - Inserted text values read back unchanged, whatever characters they hold
//! - Row ids grow strictly across sequential inserts
//! - A rolled-back transaction leaves the table exactly as it was

#[cfg(test)]
mod tests {
    use litecrud::{Database, Record, RowScope, Value};
    use proptest::prelude::*;
    use rusqlite::Connection;
    use tempfile::TempDir;

    // Test infrastructure

    /// Creates a database file with an `items` table and opens a handle on it
    fn create_items_db() -> (TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE items (id INTEGER PRIMARY KEY, label TEXT, qty INTEGER);")
            .unwrap();

        let mut db = Database::new(&path);
        db.open().unwrap();
        (dir, db)
    }

    fn all_items(db: &Database) -> Vec<Record> {
        db.select("items").order_by("id").fetch().unwrap()
    }

    /// A mutation applied inside a transaction that is later rolled back
    #[derive(Debug, Clone)]
    enum Mutation {
        Insert(String),
        UpdateAll(u8),
        DeleteLabel(String),
    }

    fn arb_label() -> impl Strategy<Value = String> {
        prop_oneof![
            "[a-z]{1,8}",
            Just("O'Reilly".to_string()),
            Just("\" OR \"1\" = \"1".to_string()),
            Just("x'); DROP TABLE items; --".to_string()),
            "\\PC{0,16}",
        ]
    }

    fn arb_mutation() -> impl Strategy<Value = Mutation> {
        prop_oneof![
            arb_label().prop_map(Mutation::Insert),
            any::<u8>().prop_map(Mutation::UpdateAll),
            arb_label().prop_map(Mutation::DeleteLabel),
        ]
    }

    // Property tests

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Any text inserted comes back byte-for-byte, including quotes
        #[test]
        fn prop_text_values_round_trip(label in arb_label()) {
            let (_dir, db) = create_items_db();

            db.insert("items", [("label", label.as_str())]).unwrap();
            let rows = db.select("items").fields(["label"]).fetch().unwrap();

            prop_assert_eq!(rows.len(), 1);
            prop_assert_eq!(rows[0].get("label").cloned(), Some(Value::Text(label.clone())));

            let matched = db.select("items").filter("label", label.as_str()).fetch().unwrap();
            prop_assert_eq!(matched.len(), 1);
            prop_assert_eq!(db.tables().unwrap(), vec!["items".to_string()]);
        }

        /// Row ids are strictly increasing when nothing is deleted
        #[test]
        fn prop_row_ids_strictly_increase(labels in prop::collection::vec("[a-z]{0,6}", 1..20)) {
            let (_dir, db) = create_items_db();

            let mut previous = 0;
            for label in &labels {
                let id = db.insert("items", [("label", label.as_str())]).unwrap();
                prop_assert!(id > previous, "id {} did not exceed {}", id, previous);
                previous = id;
            }
        }

        /// Rolling back undoes any mix of inserts, updates and deletes
        #[test]
        fn prop_rollback_restores_state(
            seed in prop::collection::vec(arb_label(), 0..5),
            mutations in prop::collection::vec(arb_mutation(), 1..10),
        ) {
            let (_dir, db) = create_items_db();
            for label in &seed {
                db.insert("items", [("label", label.as_str()), ("qty", "1")]).unwrap();
            }
            let before = all_items(&db);

            db.start_transaction().unwrap();
            for mutation in &mutations {
                match mutation {
                    Mutation::Insert(label) => {
                        db.insert("items", [("label", label.as_str())]).unwrap();
                    }
                    Mutation::UpdateAll(qty) => {
                        db.update("items", [("qty", qty.to_string())], RowScope::AllRows).unwrap();
                    }
                    Mutation::DeleteLabel(label) => {
                        db.delete("items", RowScope::matching([("label", label.as_str())])).unwrap();
                    }
                }
            }
            db.rollback_transaction().unwrap();

            prop_assert_eq!(all_items(&db), before);
        }
    }
}
