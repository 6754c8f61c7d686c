use bookshelf_core::db::open_db_in_memory;
use bookshelf_core::{
    Author, Book, EntityService, FilterError, RoleEntitlement, ServiceError,
    SqliteEntityRepository,
};
use rusqlite::Connection;
use uuid::Uuid;

fn seed_books(conn: &Connection) -> (Uuid, Vec<Book>) {
    let author_id = Uuid::new_v4();
    let service = EntityService::new(SqliteEntityRepository::<Book>::try_new(conn).unwrap());

    let mut rows = Vec::new();
    for (title, year, price, in_stock, isbn) in [
        ("Programming Rust", 2017, Some(39.99), true, Some("978-1491927281")),
        ("Rust in Action", 2021, Some(49.0), false, None),
        ("The 50%_Solution", 1999, None, true, Some("111")),
        ("Zero to Production", 2022, Some(35.0), true, None),
    ] {
        let mut book = Book::new(title);
        book.published_year = Some(year);
        book.price = price;
        book.in_stock = in_stock;
        book.isbn = isbn.map(str::to_string);
        if year > 2000 {
            book.author_id = Some(author_id);
        }
        rows.push(service.create(book).unwrap());
    }
    (author_id, rows)
}

fn list_titles(conn: &Connection, filters: &str) -> Vec<String> {
    let service = EntityService::new(SqliteEntityRepository::<Book>::try_new(conn).unwrap());
    service
        .list(Some(filters))
        .unwrap()
        .into_iter()
        .map(|book| book.title)
        .collect()
}

#[test]
fn absent_or_empty_filters_return_everything() {
    let conn = open_db_in_memory().unwrap();
    seed_books(&conn);
    let service = EntityService::new(SqliteEntityRepository::<Book>::try_new(&conn).unwrap());

    assert_eq!(service.list(None).unwrap().len(), 4);
    assert_eq!(service.list(Some("")).unwrap().len(), 4);
    assert_eq!(service.list(Some("[]")).unwrap().len(), 4);
}

#[test]
fn numeric_range_filters_combine_with_and() {
    let conn = open_db_in_memory().unwrap();
    seed_books(&conn);

    let titles = list_titles(
        &conn,
        r#"[{"Property":"PublishedYear","Operator":"GreaterThan","Value":2000},
            {"Property":"Price","Operator":"LessThanOrEqual","Value":"40"}]"#,
    );
    assert_eq!(titles, ["Programming Rust", "Zero to Production"]);
}

#[test]
fn text_operators_are_case_insensitive_and_escape_wildcards() {
    let conn = open_db_in_memory().unwrap();
    seed_books(&conn);

    let titles = list_titles(
        &conn,
        r#"[{"Property":"Title","Operator":"Contains","Value":"RUST"}]"#,
    );
    assert_eq!(titles, ["Programming Rust", "Rust in Action"]);

    let titles = list_titles(
        &conn,
        r#"[{"Property":"title","Operator":"startswith","Value":"rust"}]"#,
    );
    assert_eq!(titles, ["Rust in Action"]);

    let titles = list_titles(
        &conn,
        r#"[{"Property":"Title","Operator":"Contains","Value":"50%_"}]"#,
    );
    assert_eq!(titles, ["The 50%_Solution"]);

    let titles = list_titles(
        &conn,
        r#"[{"Property":"Title","Operator":"Contains","Value":"0%"}]"#,
    );
    assert_eq!(titles, ["The 50%_Solution"]);

    let titles = list_titles(
        &conn,
        r#"[{"Property":"Title","Operator":"EndsWith","Value":"action"}]"#,
    );
    assert_eq!(titles, ["Rust in Action"]);
}

#[test]
fn bool_uuid_and_null_filters() {
    let conn = open_db_in_memory().unwrap();
    let (author_id, _) = seed_books(&conn);

    let titles = list_titles(
        &conn,
        r#"[{"Property":"InStock","Operator":"Equal","Value":false}]"#,
    );
    assert_eq!(titles, ["Rust in Action"]);

    let titles = list_titles(
        &conn,
        &format!(r#"[{{"Property":"AuthorId","Operator":"Equal","Value":"{author_id}"}}]"#),
    );
    assert_eq!(
        titles,
        ["Programming Rust", "Rust in Action", "Zero to Production"]
    );

    let titles = list_titles(
        &conn,
        r#"[{"Property":"AuthorId","Operator":"Equal","Value":null}]"#,
    );
    assert_eq!(titles, ["The 50%_Solution"]);

    let titles = list_titles(
        &conn,
        r#"[{"Property":"Price","Operator":"NotEqual","Value":null}]"#,
    );
    assert_eq!(
        titles,
        ["Programming Rust", "Rust in Action", "Zero to Production"]
    );
}

#[test]
fn not_equal_keeps_rows_with_null_values() {
    let conn = open_db_in_memory().unwrap();
    seed_books(&conn);

    let titles = list_titles(
        &conn,
        r#"[{"Property":"Isbn","Operator":"NotEqual","Value":"111"}]"#,
    );
    assert_eq!(
        titles,
        ["Programming Rust", "Rust in Action", "Zero to Production"]
    );
}

#[test]
fn filter_by_id() {
    let conn = open_db_in_memory().unwrap();
    let (_, rows) = seed_books(&conn);

    let target = &rows[2];
    let titles = list_titles(
        &conn,
        &format!(r#"[{{"Property":"Id","Operator":"Equal","Value":"{}"}}]"#, target.id),
    );
    assert_eq!(titles, [target.title.clone()]);
}

#[test]
fn filters_apply_to_every_resource() {
    let conn = open_db_in_memory().unwrap();

    let authors = EntityService::new(SqliteEntityRepository::<Author>::try_new(&conn).unwrap());
    let mut ada = Author::new("Ada Lovelace");
    ada.birth_year = Some(1815);
    authors.create(ada).unwrap();
    authors.create(Author::new("Grace Hopper")).unwrap();

    let found = authors
        .list(Some(r#"[{"Property":"BirthYear","Operator":"LessThan","Value":1900}]"#))
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Ada Lovelace");

    let grants = EntityService::new(
        SqliteEntityRepository::<RoleEntitlement>::try_new(&conn).unwrap(),
    );
    let mut disabled = RoleEntitlement::new("viewer", "books:read");
    disabled.is_enabled = false;
    grants.create(disabled).unwrap();
    grants
        .create(RoleEntitlement::new("editor", "books:write"))
        .unwrap();

    let enabled = grants
        .list(Some(
            r#"[{"Property":"IsEnabled","Operator":"Equal","Value":"true"},
                {"Property":"RoleName","Operator":"Equal","Value":"editor"}]"#,
        ))
        .unwrap();
    assert_eq!(enabled.len(), 1);
    assert_eq!(enabled[0].entitlement, "books:write");
}

#[test]
fn invalid_filters_surface_as_filter_errors() {
    let conn = open_db_in_memory().unwrap();
    let service = EntityService::new(SqliteEntityRepository::<Book>::try_new(&conn).unwrap());

    let err = service.list(Some("not json")).unwrap_err();
    assert!(matches!(err, ServiceError::Filter(FilterError::MalformedJson(_))));

    let err = service
        .list(Some(r#"[{"Property":"Publisher","Operator":"Equal","Value":"x"}]"#))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Filter(FilterError::UnknownProperty { .. })
    ));

    let err = service
        .list(Some(r#"[{"Property":"Title","Operator":"Like","Value":"x"}]"#))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Filter(FilterError::UnknownOperator(_))
    ));
}

#[test]
fn filter_values_are_bound_not_interpolated() {
    let conn = open_db_in_memory().unwrap();
    seed_books(&conn);

    let titles = list_titles(
        &conn,
        r#"[{"Property":"Title","Operator":"Equal","Value":"x' OR '1'='1"}]"#,
    );
    assert!(titles.is_empty());

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM books;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 4);
}
