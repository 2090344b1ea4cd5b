//! Keyword and operator tables for the MySQL dialect.

use crate::token::TokenFlags;
use std::collections::HashMap;
use std::sync::OnceLock;

const RESERVED: &[&str] = &[
    "ACCESSIBLE", "ADD", "ALL", "ALTER", "ANALYZE", "AND", "AS", "ASC", "BEFORE", "BETWEEN",
    "BIGINT", "BINARY", "BLOB", "BOTH", "BY", "CALL", "CASCADE", "CASE", "CHANGE", "CHAR",
    "CHARACTER", "CHECK", "COLLATE", "COLUMN", "CONDITION", "CONSTRAINT", "CONTINUE", "CONVERT",
    "CREATE", "CROSS", "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP", "CURRENT_USER",
    "CURSOR", "DATABASE", "DATABASES", "DAY_HOUR", "DAY_MICROSECOND", "DAY_MINUTE",
    "DAY_SECOND", "DEC", "DECIMAL", "DECLARE", "DEFAULT", "DELAYED", "DELETE", "DESC",
    "DESCRIBE", "DETERMINISTIC", "DISTINCT", "DISTINCTROW", "DIV", "DOUBLE", "DROP", "DUAL",
    "EACH", "ELSE", "ELSEIF", "ENCLOSED", "ESCAPED", "EXISTS", "EXIT", "EXPLAIN", "FETCH",
    "FLOAT", "FOR", "FORCE", "FOREIGN", "FROM", "FULLTEXT", "GENERATED", "GET", "GRANT",
    "GROUP", "HAVING", "HIGH_PRIORITY", "HOUR_MICROSECOND", "HOUR_MINUTE", "HOUR_SECOND", "IF",
    "IGNORE", "IN", "INDEX", "INFILE", "INNER", "INOUT", "INSENSITIVE", "INSERT", "INT",
    "INTEGER", "INTERVAL", "INTO", "IS", "ITERATE", "JOIN", "KEY", "KEYS", "KILL", "LEADING",
    "LEAVE", "LEFT", "LIKE", "LIMIT", "LINEAR", "LINES", "LOAD", "LOCALTIME", "LOCALTIMESTAMP",
    "LOCK", "LONG", "LONGBLOB", "LONGTEXT", "LOOP", "LOW_PRIORITY", "MATCH", "MAXVALUE",
    "MEDIUMBLOB", "MEDIUMINT", "MEDIUMTEXT", "MIDDLEINT", "MINUTE_MICROSECOND", "MINUTE_SECOND",
    "MOD", "MODIFIES", "NATURAL", "NOT", "NO_WRITE_TO_BINLOG", "NULL", "NUMERIC", "ON",
    "OPTIMIZE", "OPTION", "OPTIONALLY", "OR", "ORDER", "OUT", "OUTER", "OUTFILE", "PARTITION",
    "PRECISION", "PRIMARY", "PROCEDURE", "PURGE", "RANGE", "READ", "READS", "REAL",
    "REFERENCES", "REGEXP", "RELEASE", "RENAME", "REPEAT", "REPLACE", "REQUIRE", "RESIGNAL",
    "RESTRICT", "RETURN", "REVOKE", "RIGHT", "RLIKE", "SCHEMA", "SCHEMAS", "SECOND_MICROSECOND",
    "SELECT", "SENSITIVE", "SEPARATOR", "SET", "SHOW", "SIGNAL", "SMALLINT", "SPATIAL",
    "SPECIFIC", "SQL", "SQLEXCEPTION", "SQLSTATE", "SQLWARNING", "SQL_BIG_RESULT",
    "SQL_CALC_FOUND_ROWS", "SQL_SMALL_RESULT", "SSL", "STARTING", "STORED", "STRAIGHT_JOIN",
    "TABLE", "TERMINATED", "THEN", "TINYBLOB", "TINYINT", "TINYTEXT", "TO", "TRAILING",
    "TRIGGER", "UNDO", "UNION", "UNIQUE", "UNLOCK", "UNSIGNED", "UPDATE", "USAGE", "USE",
    "USING", "UTC_DATE", "UTC_TIME", "UTC_TIMESTAMP", "VALUES", "VARBINARY", "VARCHAR",
    "VARCHARACTER", "VARYING", "VIRTUAL", "WHEN", "WHERE", "WHILE", "WITH", "WRITE", "XOR",
    "YEAR_MONTH", "ZEROFILL",
];

const NON_RESERVED: &[&str] = &[
    "ACTION", "AFTER", "AGAINST", "ALGORITHM", "ANY", "AUTO_INCREMENT", "AVG_ROW_LENGTH", "BEGIN",
    "BTREE", "CHARSET", "CHECKSUM", "COLUMNS", "COMMENT", "COMMIT", "COMMITTED", "COMPACT",
    "COMPRESSED", "DATA", "DAY", "DELIMITER", "DISABLE", "DUPLICATE", "DYNAMIC", "ENABLE",
    "ENGINE", "ENGINES", "ESCAPE", "EVENT", "EXTENDED", "FIELDS", "FIRST", "FULL", "FUNCTION",
    "GLOBAL", "GRANTS", "HASH", "HOUR", "INDEXES", "ISOLATION", "LAST", "LEVEL", "LOCAL",
    "MICROSECOND", "MINUTE", "MODE", "MODIFY", "MONTH", "NAMES", "NO", "OFFSET", "PARTIAL",
    "PASSWORD", "PLUGINS", "PROCESSLIST", "QUARTER", "QUICK", "REDUNDANT", "REPAIR", "ROLLBACK",
    "ROW", "ROW_FORMAT", "ROWS", "SAVEPOINT", "SECOND", "SESSION", "SHARE", "SIMPLE", "SNAPSHOT",
    "START", "STATUS", "TABLES", "TEMPORARY", "TRANSACTION", "UNCOMMITTED", "UNKNOWN",
    "VARIABLES", "VIEW", "WARNINGS", "WEEK", "WORK",
];

const DATA_TYPES: &[&str] = &[
    "BIT", "BOOL", "BOOLEAN", "TINYINT", "SMALLINT", "MEDIUMINT", "INT", "INTEGER", "BIGINT",
    "FLOAT", "DOUBLE", "REAL", "DECIMAL", "DEC", "NUMERIC", "FIXED", "DATE", "DATETIME",
    "TIMESTAMP", "TIME", "YEAR", "CHAR", "VARCHAR", "NCHAR", "NVARCHAR", "BINARY", "VARBINARY",
    "TINYBLOB", "BLOB", "MEDIUMBLOB", "LONGBLOB", "TINYTEXT", "TEXT", "MEDIUMTEXT", "LONGTEXT",
    "JSON", "ENUM", "SET", "GEOMETRY", "POINT", "LINESTRING", "POLYGON", "MULTIPOINT",
    "MULTILINESTRING", "MULTIPOLYGON", "GEOMETRYCOLLECTION", "GEOMCOLLECTION",
];

const KEYS: &[&str] = &["KEY", "INDEX", "UNIQUE", "PRIMARY", "FULLTEXT", "SPATIAL", "FOREIGN"];

const FUNCTIONS: &[&str] = &[
    "ABS", "ACOS", "ADDDATE", "ADDTIME", "ASCII", "ASIN", "ATAN", "AVG", "BIN", "BIT_LENGTH",
    "CAST", "CEIL", "CEILING", "CHAR", "CHAR_LENGTH", "CHARACTER_LENGTH", "COALESCE", "CONCAT",
    "CONCAT_WS", "CONVERT", "COS", "COT", "COUNT", "CRC32", "CURDATE", "CURTIME", "DATABASE",
    "DATE", "DATE_ADD", "DATE_FORMAT", "DATE_SUB", "DATEDIFF", "DAY", "DAYNAME", "DAYOFMONTH",
    "DAYOFWEEK", "DAYOFYEAR", "DEGREES", "ELT", "EXP", "EXTRACT", "FIELD", "FIND_IN_SET",
    "FLOOR", "FORMAT", "FOUND_ROWS", "FROM_DAYS", "FROM_UNIXTIME", "GET_LOCK", "GREATEST",
    "GROUP_CONCAT", "HEX", "HOUR", "IF", "IFNULL", "INSTR", "ISNULL", "LAST_INSERT_ID", "LCASE",
    "LEAST", "LEFT", "LENGTH", "LN", "LOCATE", "LOG", "LOG10", "LOG2", "LOWER", "LPAD", "LTRIM",
    "MAKEDATE", "MAX", "MD5", "MICROSECOND", "MID", "MIN", "MINUTE", "MOD", "MONTH",
    "MONTHNAME", "NOW", "NULLIF", "OCT", "ORD", "PI", "POSITION", "POW", "POWER", "QUARTER",
    "RADIANS", "RAND", "REGEXP_LIKE", "REGEXP_REPLACE", "REGEXP_SUBSTR", "RELEASE_LOCK",
    "REPEAT", "REPLACE", "REVERSE", "RIGHT", "ROUND", "RPAD", "RTRIM", "SEC_TO_TIME", "SECOND",
    "SIGN", "SIN", "SLEEP", "SOUNDEX", "SPACE", "SQRT", "STD", "STDDEV", "STR_TO_DATE",
    "STRCMP", "SUBDATE", "SUBSTR", "SUBSTRING", "SUBSTRING_INDEX", "SUM", "SYSDATE", "TAN",
    "TIME", "TIME_FORMAT", "TIME_TO_SEC", "TIMEDIFF", "TIMESTAMP", "TIMESTAMPDIFF", "TO_DAYS",
    "TRIM", "TRUNCATE", "UCASE", "UNHEX", "UNIX_TIMESTAMP", "UPPER", "USER", "UTC_DATE",
    "UTC_TIME", "UTC_TIMESTAMP", "UUID", "VALUES", "VERSION", "WEEK", "WEEKDAY", "YEAR",
    "YEARWEEK",
];

/// Multi-word keywords, matched with any run of whitespace between words.
const COMPOSED: &[(&str, u32)] = &[
    ("ON DUPLICATE KEY UPDATE", R),
    ("DEFAULT CHARACTER SET", R),
    ("LOCK IN SHARE MODE", R),
    ("IF NOT EXISTS", R),
    ("DEFAULT CHARSET", R),
    ("DEFAULT COLLATE", R),
    ("START TRANSACTION", R),
    ("DOUBLE PRECISION", D),
    ("FULLTEXT INDEX", R | K),
    ("SPATIAL INDEX", R | K),
    ("CHARACTER SET", R),
    ("FULLTEXT KEY", R | K),
    ("UNIQUE INDEX", R | K),
    ("PRIMARY KEY", R | K),
    ("SPATIAL KEY", R | K),
    ("FOREIGN KEY", R | K),
    ("UNIQUE KEY", R | K),
    ("WITH ROLLUP", R),
    ("IF EXISTS", R),
    ("ON DELETE", R),
    ("ON UPDATE", R),
    ("FOR UPDATE", R),
    ("GROUP BY", R),
    ("ORDER BY", R),
    ("NOT NULL", R),
];

const R: u32 = TokenFlags::RESERVED.bits();
const K: u32 = TokenFlags::KEY.bits();
const D: u32 = TokenFlags::DATA_TYPE.bits();

const OPERATORS: &[(&str, TokenFlags)] = &[
    ("<=>", TokenFlags::LOGICAL),
    ("!=", TokenFlags::LOGICAL),
    ("&&", TokenFlags::LOGICAL),
    ("<=", TokenFlags::LOGICAL),
    ("<>", TokenFlags::LOGICAL),
    (">=", TokenFlags::LOGICAL),
    ("||", TokenFlags::LOGICAL),
    ("<<", TokenFlags::BITWISE),
    (">>", TokenFlags::BITWISE),
    (":=", TokenFlags::ASSIGNMENT),
    ("%", TokenFlags::ARITHMETIC),
    ("*", TokenFlags::ARITHMETIC),
    ("+", TokenFlags::ARITHMETIC),
    ("-", TokenFlags::ARITHMETIC),
    ("/", TokenFlags::ARITHMETIC),
    ("!", TokenFlags::LOGICAL),
    ("<", TokenFlags::LOGICAL),
    ("=", TokenFlags::LOGICAL),
    (">", TokenFlags::LOGICAL),
    ("&", TokenFlags::BITWISE),
    ("^", TokenFlags::BITWISE),
    ("|", TokenFlags::BITWISE),
    ("~", TokenFlags::BITWISE),
    ("(", TokenFlags::SQL),
    (")", TokenFlags::SQL),
    (".", TokenFlags::SQL),
    (",", TokenFlags::SQL),
    (";", TokenFlags::SQL),
];

fn keyword_table() -> &'static HashMap<&'static str, TokenFlags> {
    static TABLE: OnceLock<HashMap<&'static str, TokenFlags>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table: HashMap<&'static str, TokenFlags> = HashMap::new();
        let mut add = |words: &[&'static str], flags: TokenFlags| {
            for w in words {
                *table.entry(*w).or_insert(TokenFlags::empty()) |= flags;
            }
        };
        add(RESERVED, TokenFlags::RESERVED);
        add(NON_RESERVED, TokenFlags::empty());
        add(DATA_TYPES, TokenFlags::DATA_TYPE);
        add(KEYS, TokenFlags::KEY);
        add(FUNCTIONS, TokenFlags::FUNCTION);
        table
    })
}

/// Flags of a single-word keyword, or `None` for a plain identifier.
pub fn keyword_flags(word: &str) -> Option<TokenFlags> {
    keyword_table()
        .get(word.to_ascii_uppercase().as_str())
        .copied()
}

/// Composed keywords, longest first.
pub fn composed_keywords() -> impl Iterator<Item = (&'static str, TokenFlags)> {
    COMPOSED
        .iter()
        .map(|(words, bits)| (*words, TokenFlags::from_bits_truncate(*bits) | TokenFlags::COMPOSED))
}

/// Operators, longest first so that `<=>` wins over `<=` and `<`.
pub fn operators() -> &'static [(&'static str, TokenFlags)] {
    OPERATORS
}

pub fn is_function(word: &str) -> bool {
    keyword_flags(word).is_some_and(|f| f.contains(TokenFlags::FUNCTION))
}
