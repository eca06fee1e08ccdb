#![allow(dead_code)]

use chrono::{DateTime, Utc};
use scopekit_sqlx::prelude::*;
use scopekit_sqlx::DbPool;

#[derive(Debug, Clone, Default, PartialEq, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    #[sqlx(default)]
    pub age: i64,
    #[sqlx(default)]
    pub email: Option<String>,
    #[sqlx(default)]
    pub created_at: DateTime<Utc>,
    #[sqlx(default)]
    pub updated_at: DateTime<Utc>,
    #[sqlx(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(name: &str, age: i64) -> Self {
        Self {
            name: name.into(),
            age,
            ..Self::default()
        }
    }
}

impl Entity for User {
    type Id = i64;

    fn table_name() -> &'static str {
        "users"
    }

    fn columns() -> &'static [&'static str] {
        &["id", "name", "age", "email", "created_at", "updated_at", "deleted_at"]
    }

    fn id(&self) -> &i64 {
        &self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.into(),
            self.name.clone().into(),
            self.age.into(),
            self.email.clone().into(),
            self.created_at.into(),
            self.updated_at.into(),
            self.deleted_at.into(),
        ]
    }

    fn soft_delete_column() -> Option<&'static str> {
        Some("deleted_at")
    }

    fn created_at_column() -> Option<&'static str> {
        Some("created_at")
    }

    fn updated_at_column() -> Option<&'static str> {
        Some("updated_at")
    }
}

/// Hard-delete model.
#[derive(Debug, Clone, Default, PartialEq, sqlx::FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub stock: i64,
}

impl Product {
    pub fn new(name: &str, stock: i64) -> Self {
        Self {
            id: 0,
            name: name.into(),
            stock,
        }
    }
}

impl Entity for Product {
    type Id = i64;

    fn table_name() -> &'static str {
        "products"
    }

    fn columns() -> &'static [&'static str] {
        &["id", "name", "stock"]
    }

    fn id(&self) -> &i64 {
        &self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![self.id.into(), self.name.clone().into(), self.stock.into()]
    }
}

const SCHEMA: &[&str] = &[
    "CREATE TABLE users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        age INTEGER NOT NULL DEFAULT 0,
        email TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        deleted_at TEXT
    )",
    "CREATE TABLE products (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        stock INTEGER NOT NULL DEFAULT 0
    )",
];

/// Fresh in-memory database with the test schema.
pub async fn pool() -> DbPool {
    let pool = DataSourceConfig::new("sqlite::memory:")
        .connect()
        .await
        .expect("in-memory pool");
    for ddl in SCHEMA {
        sqlx::query(ddl).execute(&pool).await.expect("schema");
    }
    pool
}

pub async fn repos() -> (Repository<User>, Repository<Product>) {
    let pool = pool().await;
    (
        Repository::new(pool.clone()).expect("valid user entity"),
        Repository::new(pool).expect("valid product entity"),
    )
}

pub async fn seed_users(repo: &Repository<User>, people: &[(&str, i64)]) -> Vec<User> {
    let mut out = Vec::with_capacity(people.len());
    for (name, age) in people {
        let mut user = User::new(name, *age);
        repo.create(None, &mut user).await.expect("create user");
        out.push(user);
    }
    out
}

pub async fn seed_products(repo: &Repository<Product>, n: usize) {
    let mut products: Vec<Product> = (1..=n)
        .map(|i| Product::new(&format!("p{i:02}"), i as i64))
        .collect();
    repo.batch_insert(None, &mut products, None)
        .await
        .expect("seed products");
}
