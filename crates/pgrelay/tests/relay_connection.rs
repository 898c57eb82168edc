//! End-to-end pagination tests against a live database.
//!
//! Set `DATABASE_URL` (or put it in `.env`) to run them; they are skipped otherwise. All tables
//! are temporary, so nothing outlives the test connection.

use pgrelay::pgrelay_sql::{ident, sql, value};
use pgrelay::{
    BuildOptions, Connection, ConnectionArgs, ConnectionSetup, QueryBuilder, RelayResult,
};
use serde_json::{Value, json};
use tokio_postgres::{Client, NoTls};

const SETUP: &str = "
    create temporary table items (id int primary key, pos int not null, name text);
    insert into items (id, pos, name) values
        (1, 10, 'one'), (2, 20, 'two'), (3, 20, 'three'), (4, 30, 'four'), (5, 40, 'five');
    create temporary table tags (item_id int not null, name text not null);
    insert into tags (item_id, name) values (1, 'b'), (1, 'a'), (2, 'c');
    create temporary table positions (pos int primary key);
    insert into positions (pos) values (1), (2), (3), (4), (5);
";

async fn connect(test: &str) -> RelayResult<Option<Client>> {
    dotenvy::dotenv().ok();
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(v) => v,
        Err(_) => {
            eprintln!("DATABASE_URL is not set; skipping {test}");
            return Ok(None);
        }
    };
    let (client, connection) = tokio_postgres::connect(&database_url, NoTls).await?;
    tokio::spawn(async move {
        let _ = connection.await;
    });
    client.batch_execute(SETUP).await?;
    Ok(Some(client))
}

/// `items` ordered by `pos`, with `id` as tie-breaker.
fn items_by_pos(args: &ConnectionArgs, ascending: bool) -> RelayResult<QueryBuilder> {
    let mut qb = QueryBuilder::new();
    qb.from(ident("items"), None)?;
    let t = qb.get_table_alias()?;
    qb.select(t.col("id"), "id")?
        .order_by(t.col("pos"), ascending, None)?;
    ConnectionSetup::new(["id"]).apply(&mut qb, args)?;
    Ok(qb)
}

fn ids(page: &Connection) -> Vec<i64> {
    page.edges
        .iter()
        .filter_map(|e| e.node["id"].as_i64())
        .collect()
}

fn end_cursor(page: &Connection) -> String {
    page.page_info.end_cursor.clone().unwrap_or_default()
}

fn start_cursor(page: &Connection) -> String {
    page.page_info.start_cursor.clone().unwrap_or_default()
}

#[tokio::test]
async fn forward_pagination_across_ties() -> RelayResult<()> {
    let Some(client) = connect("forward_pagination_across_ties").await? else {
        return Ok(());
    };

    let page = items_by_pos(&ConnectionArgs::new().first(2), true)?
        .fetch_connection(&client)
        .await?;
    assert_eq!(ids(&page), [1, 2]);
    assert!(page.page_info.has_next_page);
    assert!(!page.page_info.has_previous_page);

    let args = ConnectionArgs::new().first(2).after(end_cursor(&page));
    let page = items_by_pos(&args, true)?.fetch_connection(&client).await?;
    assert_eq!(ids(&page), [3, 4]);
    assert!(page.page_info.has_next_page);
    assert!(page.page_info.has_previous_page);

    let args = ConnectionArgs::new().first(2).after(end_cursor(&page));
    let page = items_by_pos(&args, true)?.fetch_connection(&client).await?;
    assert_eq!(ids(&page), [5]);
    assert!(!page.page_info.has_next_page);
    assert!(page.page_info.has_previous_page);
    Ok(())
}

#[tokio::test]
async fn backward_pagination() -> RelayResult<()> {
    let Some(client) = connect("backward_pagination").await? else {
        return Ok(());
    };

    let page = items_by_pos(&ConnectionArgs::new().last(2), true)?
        .fetch_connection(&client)
        .await?;
    assert_eq!(ids(&page), [4, 5]);
    assert!(page.page_info.has_previous_page);
    assert!(!page.page_info.has_next_page);

    let args = ConnectionArgs::new().last(2).before(start_cursor(&page));
    let page = items_by_pos(&args, true)?.fetch_connection(&client).await?;
    assert_eq!(ids(&page), [2, 3]);
    assert!(page.page_info.has_previous_page);
    assert!(page.page_info.has_next_page);
    Ok(())
}

#[tokio::test]
async fn descending_order_with_ascending_tie_breaker() -> RelayResult<()> {
    let Some(client) = connect("descending_order_with_ascending_tie_breaker").await? else {
        return Ok(());
    };

    let page = items_by_pos(&ConnectionArgs::new().first(3), false)?
        .fetch_connection(&client)
        .await?;
    assert_eq!(ids(&page), [5, 4, 2]);

    let args = ConnectionArgs::new().first(3).after(end_cursor(&page));
    let page = items_by_pos(&args, false)?.fetch_connection(&client).await?;
    assert_eq!(ids(&page), [3, 1]);
    assert!(!page.page_info.has_next_page);
    Ok(())
}

#[tokio::test]
async fn natural_cursors_page_by_position() -> RelayResult<()> {
    let Some(client) = connect("natural_cursors_page_by_position").await? else {
        return Ok(());
    };

    let build = |args: &ConnectionArgs| -> RelayResult<QueryBuilder> {
        let mut qb = QueryBuilder::new();
        qb.from(ident("items"), None)?;
        let t = qb.get_table_alias()?;
        qb.select(t.col("id"), "id")?
            .order_by(t.col("id"), true, None)?;
        ConnectionSetup::new(Vec::<String>::new()).apply(&mut qb, args)?;
        Ok(qb)
    };

    let page = build(&ConnectionArgs::new().first(2))?
        .fetch_connection(&client)
        .await?;
    assert_eq!(ids(&page), [1, 2]);

    let args = ConnectionArgs::new().first(2).after(end_cursor(&page));
    let page = build(&args)?.fetch_connection(&client).await?;
    assert_eq!(ids(&page), [3, 4]);
    assert!(page.page_info.has_next_page);
    assert!(page.page_info.has_previous_page);
    Ok(())
}

#[tokio::test]
async fn flipped_rows_come_back_in_order() -> RelayResult<()> {
    let Some(client) = connect("flipped_rows_come_back_in_order").await? else {
        return Ok(());
    };

    let mut qb = QueryBuilder::new();
    qb.from(ident("items"), None)?;
    let t = qb.get_table_alias()?;
    qb.select(t.col("id"), "id")?
        .order_by(t.col("id"), true, None)?
        .last(2)?;
    let rows = qb.fetch_rows(&client, BuildOptions::default()).await?;
    let got: Vec<Value> = rows.iter().map(|r| r.get("id")).collect();
    assert_eq!(got, [json!(4), json!(5)]);
    Ok(())
}

#[tokio::test]
async fn named_child_aggregates_per_row() -> RelayResult<()> {
    let Some(client) = connect("named_child_aggregates_per_row").await? else {
        return Ok(());
    };

    let mut qb = QueryBuilder::new();
    qb.from(ident("items"), None)?;
    let t = qb.get_table_alias()?;
    qb.select(t.col("id"), "id")?
        .order_by(t.col("id"), true, None)?
        .limit(3)?;

    let child = qb.build_named_child_from("tags", ident("tags"), None)?;
    let c = child.get_table_alias()?;
    child
        .select(c.col("name"), "name")?
        .where_(sql!(c.col("item_id"), " = ", t.col("id")))?
        .order_by(c.col("name"), true, None)?;
    let tags = child.build(BuildOptions::json_aggregate())?;
    qb.select(sql!("(", tags, ")"), "tags")?;

    let rows = qb.fetch_rows(&client, BuildOptions::json()).await?;
    let objects: Vec<Value> = rows.iter().map(|r| r.get("object")).collect();
    assert_eq!(
        objects,
        [
            json!({ "id": 1, "tags": [{ "name": "a" }, { "name": "b" }] }),
            json!({ "id": 2, "tags": [{ "name": "c" }] }),
            json!({ "id": 3, "tags": [] }),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn hostile_values_stay_values() -> RelayResult<()> {
    let Some(client) = connect("hostile_values_stay_values").await? else {
        return Ok(());
    };

    let mut qb = QueryBuilder::new();
    qb.from(ident("items"), None)?;
    let t = qb.get_table_alias()?;
    qb.select(t.col("id"), "id")?
        .where_(sql!(t.col("name"), " = ", value("x'; drop table items; --".to_string())))?;
    let rows = qb.fetch_rows(&client, BuildOptions::default()).await?;
    assert!(rows.is_empty());

    let count: i64 = client
        .query_one("select count(*) from items", &[])
        .await?
        .get(0);
    assert_eq!(count, 5);
    Ok(())
}

/// `items` ordered by `id`, optionally filtered to `id <= max_id`.
fn items_by_id(
    args: &ConnectionArgs,
    setup: &ConnectionSetup,
    max_id: Option<i64>,
) -> RelayResult<QueryBuilder> {
    let mut qb = QueryBuilder::new();
    qb.from(ident("items"), None)?;
    let t = qb.get_table_alias()?;
    qb.select(t.col("id"), "id")?
        .order_by(t.col("id"), true, None)?;
    if let Some(max_id) = max_id {
        qb.where_(sql!(t.col("id"), " <= ", value(max_id as i32)))?;
    }
    setup.apply(&mut qb, args)?;
    Ok(qb)
}

#[tokio::test]
async fn last_inside_first_on_a_short_window() -> RelayResult<()> {
    let Some(client) = connect("last_inside_first_on_a_short_window").await? else {
        return Ok(());
    };

    let setup = ConnectionSetup::new(["id"]);
    let args = ConnectionArgs::new().first(5).last(2);
    let page = items_by_id(&args, &setup, Some(3))?
        .fetch_connection(&client)
        .await?;
    assert_eq!(ids(&page), [2, 3]);
    assert!(page.page_info.has_previous_page);
    assert!(!page.page_info.has_next_page);

    let page = items_by_id(&args, &setup, None)?
        .fetch_connection(&client)
        .await?;
    assert_eq!(ids(&page), [4, 5]);
    Ok(())
}

#[tokio::test]
async fn last_with_offset_has_next_page() -> RelayResult<()> {
    let Some(client) = connect("last_with_offset_has_next_page").await? else {
        return Ok(());
    };

    let args = ConnectionArgs::new().last(2).offset(1);
    let page = items_by_id(&args, &ConnectionSetup::new(["id"]), None)?
        .fetch_connection(&client)
        .await?;
    assert_eq!(ids(&page), [3, 4]);
    assert!(page.page_info.has_next_page);
    assert!(page.page_info.has_previous_page);
    Ok(())
}

#[tokio::test]
async fn cursor_tag_with_punctuation() -> RelayResult<()> {
    let Some(client) = connect("cursor_tag_with_punctuation").await? else {
        return Ok(());
    };

    let setup = ConnectionSetup::new(["id"]).cursor_tag("id.asc");
    let page = items_by_id(&ConnectionArgs::new().first(2), &setup, None)?
        .fetch_connection(&client)
        .await?;
    assert_eq!(ids(&page), [1, 2]);

    let args = ConnectionArgs::new().first(2).after(end_cursor(&page));
    let page = items_by_id(&args, &setup, None)?
        .fetch_connection(&client)
        .await?;
    assert_eq!(ids(&page), [3, 4]);
    Ok(())
}

#[tokio::test]
async fn natural_after_cursor_rejects_last() -> RelayResult<()> {
    let Some(client) = connect("natural_after_cursor_rejects_last").await? else {
        return Ok(());
    };

    let after = pgrelay::encode_cursor(&[json!("natural"), json!(1)]);
    let args = ConnectionArgs::new().last(2).after(after);
    let mut qb = QueryBuilder::new();
    qb.from(ident("items"), None)?;
    let t = qb.get_table_alias()?;
    qb.select(t.col("id"), "id")?
        .order_by(t.col("pos"), true, None)?;
    ConnectionSetup::new(Vec::<String>::new()).apply(&mut qb, &args)?;
    let err = qb.fetch_connection(&client).await.unwrap_err();
    assert!(err.is_ambiguous_pagination());
    Ok(())
}

#[tokio::test]
async fn offset_page_then_cursor_page() -> RelayResult<()> {
    let Some(client) = connect("offset_page_then_cursor_page").await? else {
        return Ok(());
    };

    let build = |args: &ConnectionArgs, offset: u64| -> RelayResult<QueryBuilder> {
        let mut qb = QueryBuilder::new();
        qb.from(ident("positions"), None)?;
        let t = qb.get_table_alias()?;
        qb.select(t.col("pos"), "pos")?
            .order_by(t.col("pos"), true, None)?
            .set_order_is_unique()?
            .limit(2)?;
        if offset > 0 {
            qb.offset(offset)?;
        }
        ConnectionSetup::new(["pos"]).apply(&mut qb, args)?;
        Ok(qb)
    };
    let positions = |page: &Connection| -> Vec<i64> {
        page.edges
            .iter()
            .filter_map(|e| e.node["pos"].as_i64())
            .collect()
    };

    let page = build(&ConnectionArgs::new(), 1)?
        .fetch_connection(&client)
        .await?;
    assert_eq!(positions(&page), [2, 3]);

    let args = ConnectionArgs::new().after(end_cursor(&page));
    let page = build(&args, 0)?.fetch_connection(&client).await?;
    assert_eq!(positions(&page), [4, 5]);
    Ok(())
}
