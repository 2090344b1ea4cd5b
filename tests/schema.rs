mod common;

use common::{column, rows, scalar, translator, FileDb};
use mysqlite::{Cell, TranslateError};

#[test]
fn change_column_keeps_rows_and_index_names() -> anyhow::Result<()> {
    let mut t = translator()?;
    t.query("CREATE TABLE t (id INT NOT NULL AUTO_INCREMENT, x VARCHAR(20), PRIMARY KEY (id), KEY idx_x (x))")?;
    t.query("INSERT INTO t (x) VALUES ('a'), ('b'), ('c')")?;

    t.query("ALTER TABLE t CHANGE COLUMN x y VARCHAR(50) NOT NULL DEFAULT ''")?;

    let data = rows(&mut t, "SELECT id, y FROM t ORDER BY id")?;
    assert_eq!(column(&data, "y"), vec!["a", "b", "c"]);

    let index = rows(&mut t, "SHOW INDEX FROM t WHERE Key_name = 'idx_x'")?;
    assert_eq!(index.len(), 1);
    assert_eq!(index.get(0, "Column_name"), Some(&Cell::text("y")));

    let described = rows(&mut t, "DESCRIBE t")?;
    assert_eq!(column(&described, "Field"), vec!["id", "y"]);
    assert_eq!(described.get(1, "Type"), Some(&Cell::text("varchar(50)")));
    assert_eq!(described.get(1, "Null"), Some(&Cell::text("NO")));
    assert_eq!(described.get(0, "Extra"), Some(&Cell::text("auto_increment")));
    Ok(())
}

#[test]
fn alter_with_several_clauses() -> anyhow::Result<()> {
    let mut t = translator()?;
    t.query("CREATE TABLE wp_users (ID bigint(20) unsigned NOT NULL AUTO_INCREMENT PRIMARY KEY, user_login varchar(60) NOT NULL DEFAULT '')")?;
    t.query("INSERT INTO wp_users (user_login) VALUES ('admin')")?;
    t.query(
        "ALTER TABLE wp_users ADD COLUMN user_status int(11) NOT NULL AFTER user_login, \
         ADD UNIQUE KEY user_login_key (user_login), ADD INDEX status (user_status)",
    )?;

    assert_eq!(scalar(&mut t, "SELECT user_status FROM wp_users")?, Cell::Int(0));
    let keys = rows(&mut t, "SHOW KEYS FROM wp_users")?;
    assert_eq!(column(&keys, "Key_name"), vec!["PRIMARY", "user_login_key", "status"]);

    let err = t.query("INSERT INTO wp_users (user_login) VALUES ('admin')").unwrap_err();
    assert!(matches!(err, TranslateError::Engine { .. }));

    t.query("ALTER TABLE wp_users DROP INDEX status, DROP COLUMN user_status")?;
    let described = rows(&mut t, "SHOW COLUMNS FROM wp_users")?;
    assert_eq!(column(&described, "Field"), vec!["ID", "user_login"]);
    Ok(())
}

#[test]
fn on_update_columns_refresh_themselves() -> anyhow::Result<()> {
    let mut t = translator()?;
    t.query(
        "CREATE TABLE s (id INT PRIMARY KEY, v INT, \
         changed TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP)",
    )?;
    t.query("INSERT INTO s (id, v, changed) VALUES (1, 1, '2000-01-01 00:00:00')")?;
    t.query("UPDATE s SET v = 2 WHERE id = 1")?;
    let changed = scalar(&mut t, "SELECT changed FROM s")?;
    assert_ne!(changed, Cell::text("2000-01-01 00:00:00"));

    let described = rows(&mut t, "DESCRIBE s changed")?;
    assert_eq!(described.get(0, "Extra"), Some(&Cell::text("on update CURRENT_TIMESTAMP")));
    Ok(())
}

#[test]
fn show_create_table_reports_mysql_types() -> anyhow::Result<()> {
    let mut t = translator()?;
    t.query(
        "CREATE TABLE IF NOT EXISTS wp_termmeta (meta_id bigint(20) unsigned NOT NULL auto_increment, \
         term_id bigint(20) unsigned NOT NULL default '0', meta_key varchar(255) default NULL, \
         meta_value longtext, PRIMARY KEY (meta_id), KEY term_id (term_id), KEY meta_key (meta_key(191)))",
    )?;
    let ddl = scalar(&mut t, "SHOW CREATE TABLE wp_termmeta")?;
    assert_eq!(ddl, Cell::text("wp_termmeta"));
    let rs = rows(&mut t, "SHOW CREATE TABLE wp_termmeta")?;
    let ddl = rs
        .get(0, "Create Table")
        .and_then(Cell::as_str)
        .unwrap_or_default()
        .to_string();
    assert!(ddl.contains("`term_id` bigint(20) unsigned NOT NULL DEFAULT '0'"), "{ddl}");
    assert!(ddl.contains("`meta_key` varchar(255) DEFAULT NULL"), "{ddl}");
    assert!(ddl.contains("KEY `meta_key` (`meta_key`)"), "{ddl}");
    Ok(())
}

#[test]
fn types_survive_reopening_the_file() -> anyhow::Result<()> {
    let db = FileDb::new()?;
    {
        let mut t = db.open()?;
        t.query("CREATE TABLE kv (k varchar(191) NOT NULL, v mediumtext, UNIQUE KEY k (k))")?;
        t.query("INSERT INTO kv (k, v) VALUES ('a', '1')")?;
        t.close()?;
    }
    let mut t = db.open()?;
    let described = rows(&mut t, "DESCRIBE kv")?;
    assert_eq!(column(&described, "Type"), vec!["varchar(191)", "mediumtext"]);
    assert_eq!(column(&described, "Key"), vec!["UNI", ""]);
    assert_eq!(scalar(&mut t, "SELECT v FROM kv WHERE k = 'A'")?, Cell::text("1"));

    let tables = rows(&mut t, "SHOW TABLES")?;
    assert_eq!(column(&tables, "Tables_in_main"), vec!["kv"]);
    Ok(())
}

#[test]
fn drop_truncate_and_maintenance() -> anyhow::Result<()> {
    let db = FileDb::new()?;
    let mut t = db.open()?;
    t.query("CREATE TABLE a (id INT AUTO_INCREMENT PRIMARY KEY, n INT)")?;
    t.query("CREATE TABLE b (n INT)")?;
    t.query("INSERT INTO a (n) VALUES (1), (2)")?;

    t.query("TRUNCATE TABLE a")?;
    let r = t.query("INSERT INTO a (n) VALUES (3)")?;
    assert_eq!(r.last_insert_id(), Some(1));

    let report = rows(&mut t, "OPTIMIZE TABLE a, b")?;
    assert_eq!(column(&report, "Msg_text"), vec!["OK", "OK"]);
    let report = rows(&mut t, "CHECK TABLE a, gone")?;
    assert_eq!(column(&report, "Msg_type"), vec!["status", "Error"]);

    t.query("DROP TABLE a, b")?;
    assert!(rows(&mut t, "SHOW TABLES")?.is_empty());
    t.close()?;
    Ok(())
}

#[test]
fn upserts_pick_the_right_key() -> anyhow::Result<()> {
    let mut t = translator()?;
    t.query(
        "CREATE TABLE wp_options (option_id bigint(20) unsigned NOT NULL AUTO_INCREMENT, \
         option_name varchar(191) NOT NULL default '', option_value longtext NOT NULL, \
         PRIMARY KEY (option_id), UNIQUE KEY option_name (option_name))",
    )?;
    t.query("INSERT INTO wp_options (option_name, option_value) VALUES ('siteurl', 'http://a')")?;
    t.query(
        "INSERT INTO wp_options (option_name, option_value) VALUES ('siteurl', 'http://b') \
         ON DUPLICATE KEY UPDATE option_value = VALUES(option_value)",
    )?;
    assert_eq!(scalar(&mut t, "SELECT COUNT(*) FROM wp_options")?, Cell::Int(1));
    assert_eq!(
        scalar(&mut t, "SELECT option_value FROM wp_options WHERE option_name = 'siteurl'")?,
        Cell::text("http://b")
    );

    t.query(
        "INSERT INTO wp_options (option_id, option_name, option_value) VALUES (1, 'siteurl', 'http://c') \
         ON DUPLICATE KEY UPDATE option_value = VALUES(option_value)",
    )?;
    assert!(t.executed_queries()[0].contains("ON CONFLICT(\"option_id\")"));
    assert_eq!(
        scalar(&mut t, "SELECT option_value FROM wp_options")?,
        Cell::text("http://c")
    );
    Ok(())
}

#[test]
fn ignored_insert_reports_zero_id() -> anyhow::Result<()> {
    let mut t = translator()?;
    t.query("CREATE TABLE p (id INT AUTO_INCREMENT PRIMARY KEY, k VARCHAR(10) NOT NULL, UNIQUE KEY k (k))")?;
    t.query("INSERT INTO p (k) VALUES ('a'), ('b')")?;
    let r = t.query("INSERT IGNORE INTO p (k) VALUES ('a')")?;
    assert_eq!(r.affected_rows(), Some(0));
    assert_eq!(r.last_insert_id(), Some(0));
    Ok(())
}
