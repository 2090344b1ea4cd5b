mod common;

use common::{column, rows, scalar, translator};
use mysqlite::{Cell, Translator};

fn blog() -> anyhow::Result<Translator> {
    let mut t = translator()?;
    t.query(
        "CREATE TABLE wp_posts (
            ID bigint(20) unsigned NOT NULL auto_increment,
            post_title text NOT NULL,
            post_status varchar(20) NOT NULL default 'publish',
            post_date datetime NOT NULL default '0000-00-00 00:00:00',
            PRIMARY KEY  (ID),
            KEY type_status_date (post_status, post_date, ID)
        ) DEFAULT CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_520_ci",
    )?;
    for (title, status, date) in [
        ("Hello world", "publish", "2024-01-10 09:00:00"),
        ("Draft", "draft", "2024-01-11 09:00:00"),
        ("Second", "publish", "2024-02-01 12:30:00"),
        ("Third", "publish", "2024-03-05 07:08:09"),
        ("_private", "private", "2024-03-06 00:00:00"),
    ] {
        t.query(&format!(
            "INSERT INTO wp_posts (post_title, post_status, post_date) VALUES ('{title}', '{status}', '{date}')"
        ))?;
    }
    Ok(t)
}

#[test]
fn paginates_with_found_rows() -> anyhow::Result<()> {
    let mut t = blog()?;
    let page = rows(
        &mut t,
        "SELECT SQL_CALC_FOUND_ROWS ID, post_title FROM wp_posts \
         WHERE post_status = 'publish' ORDER BY post_date DESC LIMIT 0, 2",
    )?;
    assert_eq!(column(&page, "post_title"), vec!["Third", "Second"]);
    assert_eq!(scalar(&mut t, "SELECT FOUND_ROWS()")?, Cell::Int(3));
    Ok(())
}

#[test]
fn literals_never_reach_the_sql_text() -> anyhow::Result<()> {
    let mut t = blog()?;
    let hostile = "x'); DROP TABLE wp_posts; --";
    t.query(&format!(
        "INSERT INTO wp_posts (post_title) VALUES ('{}')",
        hostile.replace('\'', "\\'")
    ))?;
    assert!(t.executed_queries().iter().all(|sql| !sql.contains("DROP TABLE")));
    let stored = scalar(&mut t, "SELECT post_title FROM wp_posts ORDER BY ID DESC LIMIT 1")?;
    assert_eq!(stored, Cell::text(hostile));
    assert_eq!(scalar(&mut t, "SELECT COUNT(*) FROM wp_posts")?, Cell::Int(6));
    Ok(())
}

#[test]
fn like_with_escaped_underscore() -> anyhow::Result<()> {
    let mut t = blog()?;
    let rs = rows(&mut t, "SELECT post_title FROM wp_posts WHERE post_title LIKE '\\_%'")?;
    assert_eq!(column(&rs, "post_title"), vec!["_private"]);
    let rs = rows(&mut t, "SELECT post_title FROM wp_posts WHERE post_title LIKE '%D' ORDER BY ID")?;
    assert_eq!(column(&rs, "post_title"), vec!["Hello world", "Second", "Third"]);
    Ok(())
}

#[test]
fn date_functions_and_intervals() -> anyhow::Result<()> {
    let mut t = blog()?;
    let rs = rows(
        &mut t,
        "SELECT post_title FROM wp_posts \
         WHERE post_date > DATE_SUB('2024-03-05 12:00:00', INTERVAL 1 MONTH) ORDER BY ID",
    )?;
    assert_eq!(column(&rs, "post_title"), vec!["Third", "_private"]);

    let formatted = scalar(
        &mut t,
        "SELECT DATE_FORMAT(post_date, '%Y/%m/%d') FROM wp_posts WHERE post_title = 'Third'",
    )?;
    assert_eq!(formatted, Cell::text("2024/03/05"));

    let per_month = rows(
        &mut t,
        "SELECT MONTH(post_date) AS m, COUNT(*) AS n FROM wp_posts GROUP BY MONTH(post_date) ORDER BY m",
    )?;
    assert_eq!(column(&per_month, "n"), vec!["2", "1", "2"]);
    Ok(())
}

#[test]
fn invalid_dates_are_stored_as_zero_date() -> anyhow::Result<()> {
    let mut t = blog()?;
    t.query("UPDATE wp_posts SET post_date = '2024-02-30 10:00:00' WHERE post_title = 'Draft'")?;
    let date = scalar(&mut t, "SELECT post_date FROM wp_posts WHERE post_title = 'Draft'")?;
    assert_eq!(date, Cell::text("0000-00-00 00:00:00"));
    Ok(())
}

#[test]
fn multi_table_delete_and_limited_update() -> anyhow::Result<()> {
    let mut t = blog()?;
    t.query("CREATE TABLE wp_postmeta (meta_id bigint(20) unsigned NOT NULL AUTO_INCREMENT PRIMARY KEY, post_id bigint(20), meta_key varchar(255))")?;
    t.query("INSERT INTO wp_postmeta (post_id, meta_key) VALUES (2, 'a'), (2, 'b'), (3, 'c')")?;

    let r = t.query(
        "DELETE p, m FROM wp_posts p LEFT JOIN wp_postmeta m ON m.post_id = p.ID WHERE p.post_status = 'draft'",
    )?;
    assert_eq!(r.affected_rows(), Some(3));
    assert_eq!(scalar(&mut t, "SELECT COUNT(*) FROM wp_postmeta")?, Cell::Int(1));

    let r = t.query("UPDATE wp_posts SET post_status = 'trash' WHERE post_status = 'publish' LIMIT 1")?;
    // SQLite has no UPDATE ... LIMIT, so every match changes
    assert_eq!(r.affected_rows(), Some(3));
    Ok(())
}

#[test]
fn unsupported_statements_fail_cleanly() -> anyhow::Result<()> {
    let mut t = blog()?;
    assert!(t.query("SELECT 1; SELECT 2").is_err());
    assert!(t.last_error().is_some_and(|e| e.contains("multiple statements")));
    assert!(t.query("GRANT ALL ON *.* TO someone").is_err());

    // a failed statement does not poison the next one
    assert_eq!(scalar(&mut t, "SELECT COUNT(*) FROM wp_posts")?, Cell::Int(5));
    assert!(t.last_error().is_none());
    assert!(rows(&mut t, "SELECT @@sql_mode")?.is_empty());
    Ok(())
}

#[test]
fn table_existence_check_through_information_schema() -> anyhow::Result<()> {
    let mut t = blog()?;
    t.query("CREATE TABLE wp_users (ID bigint(20) unsigned NOT NULL AUTO_INCREMENT PRIMARY KEY)")?;

    let rs = rows(
        &mut t,
        "SELECT table_name FROM information_schema.tables \
         WHERE table_schema = 'wordpress' AND table_name = 'wp_posts'",
    )?;
    assert_eq!(column(&rs, "table_name"), vec!["wp_posts"]);
    assert_eq!(
        scalar(&mut t, "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'wp_posts'")?,
        Cell::Int(1)
    );
    assert!(rows(&mut t, "SELECT table_name FROM information_schema.tables WHERE table_name = 'wp_links'")?.is_empty());
    Ok(())
}
