use super::*;
use bson::{doc, Bson};
use mongodialect_datastructures::unchecked_unique_field_map;

macro_rules! test_render_stage {
    ($func_name:ident, expected = $expected:expr, input = $input:expr) => {
        #[test]
        fn $func_name() {
            let expected = $expected;
            let actual = $input.render();
            assert_eq!(expected, actual);
        }
    };
}

mod stages {
    use super::*;

    test_render_stage!(
        match_wraps_the_filter,
        expected = doc! { "$match": { "title": { "$eq": "Dune" } } },
        input = Stage::Match(Filter::Comparison(ComparisonFilter {
            field: "title".to_string(),
            op: ComparisonOp::Eq,
            value: Expression::Literal(LiteralValue::String("Dune".to_string())),
        }))
    );

    test_render_stage!(
        sort_directions_render_as_signed_ones,
        expected = doc! { "$sort": { "title": 1, "pages": -1 } },
        input = Stage::Sort(vec![SortSpec::asc("title"), SortSpec::desc("pages")])
    );

    test_render_stage!(
        skip_and_limit_placeholders_render_as_undefined,
        expected = doc! { "$skip": Bson::Undefined },
        input = Stage::Skip(Expression::Placeholder)
    );

    test_render_stage!(
        project_excludes_an_unprojected_id_up_front,
        expected = doc! { "$project": { "_id": 0, "title": 1, "pages": "$pageCount" } },
        input = Stage::Project(unchecked_unique_field_map! {
            "title".to_string() => ProjectItem::Include,
            "pages".to_string() => ProjectItem::Assign(
                Expression::FieldRef("pageCount".to_string()),
            ),
        })
    );

    test_render_stage!(
        explicitly_projected_id_is_left_alone,
        expected = doc! { "$project": { "_id": 1, "title": 1 } },
        input = Stage::Project(unchecked_unique_field_map! {
            "_id".to_string() => ProjectItem::Include,
            "title".to_string() => ProjectItem::Include,
        })
    );

    test_render_stage!(
        nested_logical_filters_render_recursively,
        expected = doc! { "$match": {
            "$nor": [ { "$nor": [ { "a": { "$eq": 1 } } ] } ],
        } },
        input = Stage::Match(
            Filter::Comparison(ComparisonFilter {
                field: "a".to_string(),
                op: ComparisonOp::Eq,
                value: Expression::Literal(LiteralValue::Integer(1)),
            })
            .negated()
            .negated(),
        )
    );
}

mod commands {
    use super::*;

    fn aggregate() -> Command {
        Command::Aggregate(AggregateCommand {
            collection: "books".to_string(),
            pipeline: vec![
                Stage::Match(Filter::Comparison(ComparisonFilter {
                    field: "isbn".to_string(),
                    op: ComparisonOp::Eq,
                    value: Expression::Placeholder,
                })),
                Stage::Limit(Expression::Placeholder),
                Stage::Project(unchecked_unique_field_map! {
                    "title".to_string() => ProjectItem::Include,
                }),
            ],
        })
    }

    #[test]
    fn aggregate_wire_shape() {
        assert_eq!(
            doc! {
                "aggregate": "books",
                "pipeline": [
                    { "$match": { "isbn": { "$eq": Bson::Undefined } } },
                    { "$limit": Bson::Undefined },
                    { "$project": { "_id": 0, "title": 1 } },
                ],
            },
            aggregate().render()
        );
    }

    #[test]
    fn placeholders_render_as_undefined_markers_in_text() {
        let text = aggregate().to_text();
        assert_eq!(2, text.matches(r#"{"$undefined":true}"#).count());
        assert!(text.starts_with(r#"{"aggregate":"books""#));
    }

    #[test]
    fn insert_wire_shape() {
        let command = Command::Insert(InsertCommand {
            collection: "books".to_string(),
            documents: vec![unchecked_unique_field_map! {
                "title".to_string() => Expression::Placeholder,
                "pages".to_string() => Expression::Literal(LiteralValue::Integer(412)),
            }],
        });
        assert_eq!(
            doc! {
                "insert": "books",
                "documents": [ { "title": Bson::Undefined, "pages": 412 } ],
            },
            command.render()
        );
    }

    #[test]
    fn update_wire_shape_wraps_assignments_in_set() {
        let command = Command::Update(UpdateCommand {
            collection: "books".to_string(),
            filter: Some(Filter::Comparison(ComparisonFilter {
                field: "_id".to_string(),
                op: ComparisonOp::Eq,
                value: Expression::Placeholder,
            })),
            set: unchecked_unique_field_map! {
                "title".to_string() => Expression::Placeholder,
            },
            multi: false,
        });
        assert_eq!(
            doc! {
                "update": "books",
                "updates": [ {
                    "q": { "_id": { "$eq": Bson::Undefined } },
                    "u": { "$set": { "title": Bson::Undefined } },
                    "multi": false,
                } ],
            },
            command.render()
        );
    }

    #[test]
    fn delete_multi_maps_to_limit_zero() {
        let multi = Command::Delete(DeleteCommand {
            collection: "books".to_string(),
            filter: None,
            multi: true,
        });
        assert_eq!(
            doc! { "delete": "books", "deletes": [ { "q": {}, "limit": 0 } ] },
            multi.render()
        );
        let single = Command::Delete(DeleteCommand {
            collection: "books".to_string(),
            filter: None,
            multi: false,
        });
        assert_eq!(
            doc! { "delete": "books", "deletes": [ { "q": {}, "limit": 1 } ] },
            single.render()
        );
    }

    #[test]
    fn placeholder_count_walks_in_document_order() {
        assert_eq!(2, placeholder_count(&aggregate().render()));
        assert_eq!(0, placeholder_count(&doc! { "a": 1, "b": [1, 2] }));
        assert_eq!(
            3,
            placeholder_count(&doc! {
                "a": Bson::Undefined,
                "b": { "c": Bson::Undefined },
                "d": [ Bson::Undefined, 1 ],
            })
        );
    }
}
