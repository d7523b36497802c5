use super::command::{DeleteSpec, ParsedCommand, UpdateSpec};
use super::result_set::{derive_fields, MongoResultSet};
use super::statement::{insert_failure_split, insert_run_end, pad_failed};
use super::{Error, EXECUTE_FAILED, NO_ERROR_CODE};
use bson::{bson, doc, Bson, Document};

mod command {
    use super::*;

    #[test]
    fn parses_aggregate_with_placeholders_in_document_order() {
        let text = r#"{"aggregate": "books", "pipeline": [
            {"$match": {"title": {"$eq": {"$undefined": true}}}},
            {"$skip": {"$undefined": true}},
            {"$limit": {"$undefined": true}},
            {"$project": {"_id": 0, "title": 1}}
        ]}"#;
        let command = ParsedCommand::parse(text).unwrap();
        assert_eq!("aggregate", command.kind_name());
        assert_eq!("books", command.collection());
        assert_eq!(3, command.parameter_count());

        let bound = command
            .bind(&[bson!("Dune"), Bson::Int64(10), Bson::Int64(5)])
            .unwrap();
        let ParsedCommand::Aggregate { pipeline, .. } = bound else {
            panic!("expected aggregate");
        };
        assert_eq!(
            doc! {"$match": {"title": {"$eq": "Dune"}}},
            pipeline[0]
        );
        assert_eq!(doc! {"$skip": 10i64}, pipeline[1]);
        assert_eq!(doc! {"$limit": 5i64}, pipeline[2]);
    }

    #[test]
    fn update_filters_bind_before_update_documents() {
        let text = r#"{"update": "books", "updates": [
            {"q": {"_id": {"$eq": {"$undefined": true}}},
             "u": {"$set": {"title": {"$undefined": true}}},
             "multi": false}
        ]}"#;
        let command = ParsedCommand::parse(text).unwrap();
        assert_eq!(2, command.parameter_count());
        let bound = command.bind(&[bson!(7), bson!("Dune")]).unwrap();
        let ParsedCommand::Update { updates, .. } = bound else {
            panic!("expected update");
        };
        assert_eq!(
            vec![UpdateSpec {
                filter: doc! {"_id": {"$eq": 7}},
                update: doc! {"$set": {"title": "Dune"}},
                multi: false,
            }],
            updates
        );
    }

    #[test]
    fn delete_limit_selects_single_or_multi() {
        let text = r#"{"delete": "books", "deletes": [
            {"q": {"a": 1}, "limit": 1},
            {"q": {"b": 2}, "limit": 0}
        ]}"#;
        let ParsedCommand::Delete { deletes, .. } = ParsedCommand::parse(text).unwrap() else {
            panic!("expected delete");
        };
        assert_eq!(
            vec![
                DeleteSpec {
                    filter: doc! {"a": 1},
                    multi: false,
                },
                DeleteSpec {
                    filter: doc! {"b": 2},
                    multi: true,
                },
            ],
            deletes
        );
    }

    #[test]
    fn syntax_errors_carry_the_offending_text() {
        let text = r#"{"findAndModify": "books"}"#;
        match ParsedCommand::parse(text) {
            Err(Error::Syntax { reason, text: t }) => {
                assert!(reason.contains("unknown command 'findAndModify'"));
                assert_eq!(text, t);
            }
            other => panic!("expected syntax error, got {other:?}"),
        }
        assert!(matches!(
            ParsedCommand::parse("not json"),
            Err(Error::Syntax { .. })
        ));
        assert!(matches!(
            ParsedCommand::parse(r#"{"aggregate": "books"}"#),
            Err(Error::Syntax { .. })
        ));
        assert!(matches!(
            ParsedCommand::parse(r#"{"insert": "books", "documents": []}"#),
            Err(Error::Syntax { .. })
        ));
        assert!(matches!(
            ParsedCommand::parse(r#"{"aggregate": "books", "pipeline": [42]}"#),
            Err(Error::Syntax { .. })
        ));
    }

    #[test]
    fn binding_fails_when_values_run_out() {
        let text = r#"{"insert": "books", "documents": [
            {"title": {"$undefined": true}, "isbn": {"$undefined": true}}
        ]}"#;
        let command = ParsedCommand::parse(text).unwrap();
        assert!(matches!(
            command.bind(&[bson!("Dune")]),
            Err(Error::UnboundParameter(2))
        ));
    }
}

mod batch {
    use super::*;

    fn insert(collection: &str, documents: usize) -> ParsedCommand {
        let rows: Vec<String> = (0..documents).map(|i| format!(r#"{{"n": {i}}}"#)).collect();
        let text = format!(
            r#"{{"insert": "{collection}", "documents": [{}]}}"#,
            rows.join(", ")
        );
        ParsedCommand::parse(&text).unwrap()
    }

    fn delete_all(collection: &str) -> ParsedCommand {
        let text = format!(r#"{{"delete": "{collection}", "deletes": [{{"q": {{}}}}]}}"#);
        ParsedCommand::parse(&text).unwrap()
    }

    #[test]
    fn consecutive_same_collection_inserts_form_one_run() {
        let batch = vec![
            insert("books", 2),
            insert("books", 1),
            insert("authors", 1),
            insert("books", 3),
        ];
        assert_eq!(2, insert_run_end(&batch, 0, "books"));
        assert_eq!(3, insert_run_end(&batch, 2, "authors"));
        assert_eq!(4, insert_run_end(&batch, 3, "books"));
    }

    #[test]
    fn a_non_insert_entry_breaks_the_run() {
        let batch = vec![insert("books", 1), delete_all("books"), insert("books", 1)];
        assert_eq!(1, insert_run_end(&batch, 0, "books"));
    }

    #[test]
    fn failure_offset_maps_the_failed_document_to_its_entry() {
        // entries of 2, 1, and 3 documents
        let sizes = [2usize, 1, 3];
        assert_eq!((vec![], 0), insert_failure_split(&sizes, 0));
        assert_eq!((vec![], 0), insert_failure_split(&sizes, 1));
        assert_eq!((vec![2], 1), insert_failure_split(&sizes, 2));
        assert_eq!((vec![2, 1], 2), insert_failure_split(&sizes, 3));
        assert_eq!((vec![2, 1], 2), insert_failure_split(&sizes, 5));
    }

    #[test]
    fn failure_index_past_the_run_attributes_to_the_last_entry() {
        assert_eq!((vec![2, 1], 2), insert_failure_split(&[2, 1, 3], 99));
    }

    #[test]
    fn failure_pads_remaining_counts() {
        assert_eq!(
            vec![1, 3, EXECUTE_FAILED, EXECUTE_FAILED],
            pad_failed(vec![1, 3], 4)
        );
        assert_eq!(
            vec![EXECUTE_FAILED, EXECUTE_FAILED],
            pad_failed(vec![], 2)
        );
        assert_eq!(vec![1, 1, 1], pad_failed(vec![1, 1, 1], 3));
    }
}

mod errors {
    use super::*;

    #[test]
    fn vendor_codes_default_to_zero() {
        assert_eq!(NO_ERROR_CODE, Error::Closed("connection").vendor_code());
        assert_eq!(NO_ERROR_CODE, Error::NoCurrentRow.vendor_code());
    }

    #[test]
    fn sql_states_only_where_derivable() {
        let syntax = Error::Syntax {
            reason: "bad".into(),
            text: "{}".into(),
        };
        assert_eq!(Some("42000"), syntax.sql_state());
        assert_eq!(
            Some("0A000"),
            Error::UnsupportedCursor("TYPE_SCROLL_SENSITIVE").sql_state()
        );
        assert_eq!(None, Error::NoCurrentRow.sql_state());
    }
}

mod result_set {
    use super::*;

    fn fixture() -> MongoResultSet {
        MongoResultSet::from_fixed(
            vec![
                doc! {"title": "Dune", "pages": 412i32, "outOfStock": false},
                doc! {"title": Bson::Null, "pages": 230i64},
            ],
            vec!["title".into(), "pages".into(), "outOfStock".into()],
        )
    }

    #[test]
    fn navigates_rows_and_reads_typed_values() {
        let mut rs = fixture();
        assert_eq!(3, rs.column_count().unwrap());
        assert_eq!("pages", rs.column_label(2).unwrap());

        assert!(rs.next().unwrap());
        assert_eq!(Some("Dune".to_string()), rs.get_string(1).unwrap());
        assert!(!rs.was_null().unwrap());
        assert_eq!(Some(412), rs.get_i32(2).unwrap());
        assert_eq!(Some(412), rs.get_i64(2).unwrap().map(|v| v as i32));
        assert_eq!(Some(false), rs.get_bool(3).unwrap());

        assert!(rs.next().unwrap());
        assert!(!rs.next().unwrap());
    }

    #[test]
    fn explicit_null_and_missing_field_both_read_as_null() {
        let mut rs = fixture();
        rs.next().unwrap();
        rs.next().unwrap();
        // second row: title is explicit null, outOfStock is absent
        assert_eq!(None, rs.get_string(1).unwrap());
        assert!(rs.was_null().unwrap());
        assert_eq!(None, rs.get_bool(3).unwrap());
        assert!(rs.was_null().unwrap());
        assert_eq!(Some(230), rs.get_i64(2).unwrap());
        assert!(!rs.was_null().unwrap());
    }

    #[test]
    fn lookup_by_label() {
        let mut rs = fixture();
        assert_eq!(2, rs.find_column("pages").unwrap());
        assert!(matches!(
            rs.find_column("missing"),
            Err(Error::NoSuchColumn(_))
        ));
        rs.next().unwrap();
        assert_eq!(
            Some("Dune".to_string()),
            rs.get_string_by_label("title").unwrap()
        );
    }

    #[test]
    fn rejects_reads_before_first_row_and_out_of_range_indexes() {
        let mut rs = fixture();
        assert!(matches!(rs.get_string(1), Err(Error::NoCurrentRow)));
        rs.next().unwrap();
        assert!(matches!(
            rs.get_string(0),
            Err(Error::ColumnIndexOutOfRange { index: 0, count: 3 })
        ));
        assert!(matches!(
            rs.get_string(4),
            Err(Error::ColumnIndexOutOfRange { index: 4, count: 3 })
        ));
    }

    #[test]
    fn wrong_type_reads_fail_without_coercion() {
        let mut rs = fixture();
        rs.next().unwrap();
        match rs.get_i32(1) {
            Err(Error::TypeConversion { from, .. }) => assert_eq!("string", from),
            other => panic!("expected conversion error, got {other:?}"),
        }
        assert!(matches!(rs.get_bool(2), Err(Error::TypeConversion { .. })));
    }

    #[test]
    fn close_is_idempotent_and_blocks_further_reads() {
        let mut rs = fixture();
        rs.next().unwrap();
        rs.close().unwrap();
        rs.close().unwrap();
        assert!(rs.is_closed());
        assert!(matches!(rs.next(), Err(Error::Closed("result set"))));
        assert!(matches!(rs.get_string(1), Err(Error::Closed("result set"))));
        assert!(matches!(rs.was_null(), Err(Error::Closed("result set"))));
    }

    #[test]
    fn field_labels_derive_from_the_last_project_stage() {
        let pipeline = vec![
            doc! {"$match": {"a": 1}},
            doc! {"$project": {"_id": 0, "title": 1, "pages": "$pageCount"}},
        ];
        assert_eq!(
            vec!["title".to_string(), "pages".to_string()],
            derive_fields(&pipeline)
        );
        let no_project: Vec<Document> = vec![doc! {"$match": {"a": 1}}];
        assert!(derive_fields(&no_project).is_empty());
    }
}

// The driver builds its client lazily, so every state-machine path that
// fails before reaching the server runs without one.
mod facade {
    use super::*;
    use crate::jdbc::{
        MongoConnection, ResultSetConcurrency, ResultSetHoldability, ResultSetType,
    };
    use crate::{options::QueryOptions, sql, translate_select};

    const AGGREGATE_ONE_PARAM: &str = r#"{"aggregate": "books", "pipeline": [
        {"$match": {"isbn": {"$eq": {"$undefined": true}}}},
        {"$project": {"_id": 0, "title": 1}}
    ]}"#;

    fn connection() -> MongoConnection {
        MongoConnection::connect("mongodb://localhost:27017", "library").unwrap()
    }

    #[test]
    fn parameter_index_must_be_within_declared_range() {
        let conn = connection();
        let mut stmt = conn.prepare(AGGREGATE_ONE_PARAM).unwrap();
        assert_eq!(1, stmt.parameter_count());
        assert!(matches!(
            stmt.set_string(0, "x"),
            Err(Error::ParameterIndexOutOfRange { index: 0, count: 1 })
        ));
        assert!(matches!(
            stmt.set_string(2, "x"),
            Err(Error::ParameterIndexOutOfRange { index: 2, count: 1 })
        ));
        stmt.set_string(1, "978-0441013593").unwrap();
    }

    #[test]
    fn unbound_parameters_fail_before_any_execution() {
        let conn = connection();
        let mut stmt = conn.prepare(AGGREGATE_ONE_PARAM).unwrap();
        assert!(matches!(
            stmt.execute_query(),
            Err(Error::UnboundParameter(1))
        ));
        stmt.set_string(1, "978-0441013593").unwrap();
        stmt.clear_parameters().unwrap();
        assert!(matches!(
            stmt.execute_query(),
            Err(Error::UnboundParameter(1))
        ));
    }

    #[test]
    fn scrollable_updatable_and_holdable_cursors_are_rejected_at_prepare() {
        let conn = connection();
        assert!(matches!(
            conn.prepare_with(
                AGGREGATE_ONE_PARAM,
                ResultSetType::ScrollInsensitive,
                ResultSetConcurrency::ReadOnly,
                ResultSetHoldability::CloseCursorsAtCommit,
            ),
            Err(Error::UnsupportedCursor("TYPE_SCROLL_INSENSITIVE"))
        ));
        assert!(matches!(
            conn.prepare_with(
                AGGREGATE_ONE_PARAM,
                ResultSetType::ForwardOnly,
                ResultSetConcurrency::Updatable,
                ResultSetHoldability::CloseCursorsAtCommit,
            ),
            Err(Error::UnsupportedCursor("CONCUR_UPDATABLE"))
        ));
        assert!(matches!(
            conn.prepare_with(
                AGGREGATE_ONE_PARAM,
                ResultSetType::ForwardOnly,
                ResultSetConcurrency::ReadOnly,
                ResultSetHoldability::HoldCursorsOverCommit,
            ),
            Err(Error::UnsupportedCursor("HOLD_CURSORS_OVER_COMMIT"))
        ));
        conn.prepare_with(
            AGGREGATE_ONE_PARAM,
            ResultSetType::ForwardOnly,
            ResultSetConcurrency::ReadOnly,
            ResultSetHoldability::CloseCursorsAtCommit,
        )
        .unwrap();
    }

    #[test]
    fn explicit_commit_and_rollback_require_autocommit_off() {
        let mut conn = connection();
        assert!(matches!(
            conn.commit(),
            Err(Error::AutoCommitViolation("commit"))
        ));
        assert!(matches!(
            conn.rollback(),
            Err(Error::AutoCommitViolation("rollback"))
        ));
        // without an active transaction both are no-ops
        conn.set_auto_commit(false).unwrap();
        conn.commit().unwrap();
        conn.rollback().unwrap();
    }

    #[test]
    fn autocommit_transitions_stick() {
        let mut conn = connection();
        assert!(conn.auto_commit().unwrap());
        conn.set_auto_commit(true).unwrap();
        conn.set_auto_commit(false).unwrap();
        assert!(!conn.auto_commit().unwrap());
        // no statement ran, so no transaction is open and re-enabling
        // autocommit commits nothing but must flip the mode
        conn.set_auto_commit(true).unwrap();
        assert!(conn.auto_commit().unwrap());
    }

    #[test]
    fn closed_connection_blocks_statements_and_further_prepares() {
        let mut conn = connection();
        let mut stmt = conn.prepare(AGGREGATE_ONE_PARAM).unwrap();
        stmt.set_string(1, "978-0441013593").unwrap();
        conn.close().unwrap();
        conn.close().unwrap();
        assert!(conn.is_closed());
        assert!(matches!(
            stmt.set_string(1, "x"),
            Err(Error::Closed("connection"))
        ));
        assert!(matches!(
            stmt.execute_query(),
            Err(Error::Closed("connection"))
        ));
        assert!(matches!(
            conn.prepare(AGGREGATE_ONE_PARAM),
            Err(Error::Closed("connection"))
        ));
        assert!(matches!(
            conn.auto_commit(),
            Err(Error::Closed("connection"))
        ));
    }

    #[test]
    fn closed_statement_rejects_everything_but_close() {
        let conn = connection();
        let mut stmt = conn.prepare(AGGREGATE_ONE_PARAM).unwrap();
        stmt.close().unwrap();
        stmt.close().unwrap();
        assert!(stmt.is_closed());
        assert!(matches!(
            stmt.set_string(1, "x"),
            Err(Error::Closed("statement"))
        ));
        assert!(matches!(stmt.cancel(), Err(Error::Closed("statement"))));
    }

    #[test]
    fn aggregates_cannot_be_batched() {
        let conn = connection();
        let mut stmt = conn.prepare(AGGREGATE_ONE_PARAM).unwrap();
        stmt.set_string(1, "978-0441013593").unwrap();
        assert!(matches!(
            stmt.add_batch(),
            Err(Error::WrongCommandKind {
                expected: "insert, update, or delete",
                got: "aggregate",
            })
        ));
    }

    #[test]
    fn implicit_parameters_bind_at_their_recorded_positions() {
        // runtime offset plus a user-parameterized fetch count: the implicit
        // $skip placeholder precedes the caller's $limit placeholder
        let statement = sql::SelectStatement {
            collection: sql::CollectionReference::new("books"),
            projection: vec![sql::SelectItem::new(
                "title",
                sql::Expression::Column(sql::ColumnReference::required("title")),
            )],
            predicate: None,
            order_by: vec![],
            offset: None,
            fetch: Some(sql::FetchClause {
                kind: sql::FetchClauseKind::RowsOnly,
                count: sql::Expression::Parameter,
            }),
        };
        let translation =
            translate_select(statement, QueryOptions::new().with_offset(2)).unwrap();
        let conn = connection();
        let mut stmt = conn.prepare_translation(&translation).unwrap();
        assert_eq!(1, stmt.parameter_count());
        stmt.set_i64(1, 100).unwrap();
        let ParsedCommand::Aggregate { pipeline, .. } = stmt.bound_command().unwrap() else {
            panic!("expected aggregate");
        };
        assert_eq!(doc! {"$skip": 2i64}, pipeline[0]);
        assert_eq!(doc! {"$limit": 100i64}, pipeline[1]);
    }

    #[test]
    fn failed_execution_still_discards_the_previous_result_set() {
        let conn = connection();
        let mut stmt = conn.prepare(AGGREGATE_ONE_PARAM).unwrap();
        stmt.attach_result_set(MongoResultSet::from_fixed(
            vec![doc! {"title": "Dune"}],
            vec!["title".into()],
        ));
        assert!(stmt.has_open_result_set());
        assert!(matches!(
            stmt.execute_query(),
            Err(Error::UnboundParameter(1))
        ));
        assert!(!stmt.has_open_result_set());
    }
}
