//! Shared record types for the integration tests.
//!
//! These are hand-written the way a codegen step would emit them: key and
//! foreign-key columns as `Key` fields, navigation fields skipped by serde,
//! relationship metadata as inline consts, and a `walk` that hands every
//! navigation field to the walker.
#![allow(dead_code)]

use relink::prelude::*;
use relink::{MemoryStore, Result};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Customer / Order: one-to-many with full cascades, plus a blob column.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Customer {
    pub id: Key,
    pub name: String,
    #[serde(skip)]
    pub orders: Vec<Ref<Order>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Order {
    pub id: Key,
    pub customer_id: Key,
    pub amount: i64,
    /// Stored form of `tags`.
    pub tags_json: String,
    #[serde(skip)]
    pub tags: Vec<String>,
    #[serde(skip)]
    pub customer: Option<Ref<Customer>>,
}

impl Customer {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

impl Order {
    pub fn amount(amount: i64) -> Self {
        Self {
            amount,
            ..Self::default()
        }
    }
}

impl Record for Customer {
    const TABLE: &'static str = "customers";
    const PRIMARY_KEY: &'static str = "id";
    const AUTO_KEY: bool = true;
    const RELATIONSHIPS: &'static [RelationshipInfo] = &[RelationshipInfo::new(
        "orders",
        "orders",
        RelationshipKind::OneToMany,
    )
    .remote_key("customer_id")
    .back_populates("customer")
    .cascade(Cascade::ALL)
    .related(relationships_of::<Order>)];

    fn key(&self) -> Key {
        self.id.clone()
    }

    fn set_key(&mut self, key: Key) {
        self.id = key;
    }

    fn walk<W: LinkWalker>(&mut self, walker: &mut W) -> std::result::Result<(), W::Error> {
        walker.many(ManyLink {
            info: &Self::RELATIONSHIPS[0],
            nav: &mut self.orders,
        })
    }
}

impl Record for Order {
    const TABLE: &'static str = "orders";
    const PRIMARY_KEY: &'static str = "id";
    const AUTO_KEY: bool = true;
    const RELATIONSHIPS: &'static [RelationshipInfo] = &[RelationshipInfo::new(
        "customer",
        "customers",
        RelationshipKind::ManyToOne,
    )
    .local_key("customer_id")
    .back_populates("orders")
    .cascade(Cascade::READ)
    .related(relationships_of::<Customer>)];

    fn key(&self) -> Key {
        self.id.clone()
    }

    fn set_key(&mut self, key: Key) {
        self.id = key;
    }

    fn foreign_key(&self, column: &str) -> Key {
        match column {
            "customer_id" => self.customer_id.clone(),
            _ => Key::None,
        }
    }

    fn set_foreign_key(&mut self, column: &str, key: Key) {
        if column == "customer_id" {
            self.customer_id = key;
        }
    }

    fn walk<W: LinkWalker>(&mut self, walker: &mut W) -> std::result::Result<(), W::Error> {
        walker.single(SingleLink {
            info: &Self::RELATIONSHIPS[0],
            fk: Some(&mut self.customer_id),
            nav: &mut self.customer,
        })
    }

    fn encode_blobs<C: BlobCodec>(&mut self, codec: &C) -> Result<()> {
        self.tags_json = codec.encode(&self.tags)?;
        Ok(())
    }

    fn decode_blobs<C: BlobCodec>(&mut self, codec: &C) -> Result<()> {
        if !self.tags_json.is_empty() {
            self.tags = codec.decode(&self.tags_json)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Team / Profile: one-to-one, FK on the profile side.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Team {
    pub id: Key,
    pub name: String,
    #[serde(skip)]
    pub profile: Option<Ref<Profile>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    pub id: Key,
    pub team_id: Key,
    pub motto: String,
    #[serde(skip)]
    pub team: Option<Ref<Team>>,
}

impl Record for Team {
    const TABLE: &'static str = "teams";
    const PRIMARY_KEY: &'static str = "id";
    const AUTO_KEY: bool = true;
    const RELATIONSHIPS: &'static [RelationshipInfo] = &[RelationshipInfo::new(
        "profile",
        "profiles",
        RelationshipKind::OneToOne,
    )
    .remote_key("team_id")
    .back_populates("team")
    .cascade(Cascade::ALL)
    .related(relationships_of::<Profile>)];

    fn key(&self) -> Key {
        self.id.clone()
    }

    fn set_key(&mut self, key: Key) {
        self.id = key;
    }

    fn walk<W: LinkWalker>(&mut self, walker: &mut W) -> std::result::Result<(), W::Error> {
        walker.single(SingleLink {
            info: &Self::RELATIONSHIPS[0],
            fk: None,
            nav: &mut self.profile,
        })
    }
}

impl Record for Profile {
    const TABLE: &'static str = "profiles";
    const PRIMARY_KEY: &'static str = "id";
    const AUTO_KEY: bool = true;
    const RELATIONSHIPS: &'static [RelationshipInfo] = &[RelationshipInfo::new(
        "team",
        "teams",
        RelationshipKind::OneToOne,
    )
    .local_key("team_id")
    .back_populates("profile")
    .cascade(Cascade::READ)
    .related(relationships_of::<Team>)];

    fn key(&self) -> Key {
        self.id.clone()
    }

    fn set_key(&mut self, key: Key) {
        self.id = key;
    }

    fn foreign_key(&self, column: &str) -> Key {
        match column {
            "team_id" => self.team_id.clone(),
            _ => Key::None,
        }
    }

    fn set_foreign_key(&mut self, column: &str, key: Key) {
        if column == "team_id" {
            self.team_id = key;
        }
    }

    fn walk<W: LinkWalker>(&mut self, walker: &mut W) -> std::result::Result<(), W::Error> {
        walker.single(SingleLink {
            info: &Self::RELATIONSHIPS[0],
            fk: Some(&mut self.team_id),
            nav: &mut self.team,
        })
    }
}

// ---------------------------------------------------------------------------
// Student / Course: many-to-many through a link table.
// ---------------------------------------------------------------------------

pub const STUDENT_COURSES: LinkTableInfo =
    LinkTableInfo::new("student_courses", "student_id", "course_id");
pub const COURSE_STUDENTS: LinkTableInfo =
    LinkTableInfo::new("student_courses", "course_id", "student_id");

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Student {
    pub id: Key,
    pub name: String,
    #[serde(skip)]
    pub courses: Vec<Ref<Course>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Course {
    pub id: Key,
    pub title: String,
    #[serde(skip)]
    pub students: Vec<Ref<Student>>,
}

impl Record for Student {
    const TABLE: &'static str = "students";
    const PRIMARY_KEY: &'static str = "id";
    const AUTO_KEY: bool = true;
    const RELATIONSHIPS: &'static [RelationshipInfo] = &[RelationshipInfo::new(
        "courses",
        "courses",
        RelationshipKind::ManyToMany,
    )
    .link_table(STUDENT_COURSES)
    .back_populates("students")
    .cascade(Cascade::WRITE)
    .related(relationships_of::<Course>)];

    fn key(&self) -> Key {
        self.id.clone()
    }

    fn set_key(&mut self, key: Key) {
        self.id = key;
    }

    fn walk<W: LinkWalker>(&mut self, walker: &mut W) -> std::result::Result<(), W::Error> {
        walker.many(ManyLink {
            info: &Self::RELATIONSHIPS[0],
            nav: &mut self.courses,
        })
    }
}

impl Record for Course {
    const TABLE: &'static str = "courses";
    const PRIMARY_KEY: &'static str = "id";
    const AUTO_KEY: bool = true;
    const RELATIONSHIPS: &'static [RelationshipInfo] = &[RelationshipInfo::new(
        "students",
        "students",
        RelationshipKind::ManyToMany,
    )
    .link_table(COURSE_STUDENTS)
    .back_populates("courses")
    .cascade(Cascade::READ)
    .related(relationships_of::<Student>)];

    fn key(&self) -> Key {
        self.id.clone()
    }

    fn set_key(&mut self, key: Key) {
        self.id = key;
    }

    fn walk<W: LinkWalker>(&mut self, walker: &mut W) -> std::result::Result<(), W::Error> {
        walker.many(ManyLink {
            info: &Self::RELATIONSHIPS[0],
            nav: &mut self.students,
        })
    }
}

// ---------------------------------------------------------------------------
// Author / Book: a foreign-key cycle with auto keys on both sides.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Author {
    pub id: Key,
    pub name: String,
    pub favorite_book_id: Key,
    #[serde(skip)]
    pub favorite_book: Option<Ref<Book>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Book {
    pub id: Key,
    pub title: String,
    pub author_id: Key,
    #[serde(skip)]
    pub author: Option<Ref<Author>>,
}

impl Record for Author {
    const TABLE: &'static str = "authors";
    const PRIMARY_KEY: &'static str = "id";
    const AUTO_KEY: bool = true;
    const RELATIONSHIPS: &'static [RelationshipInfo] = &[RelationshipInfo::new(
        "favorite_book",
        "books",
        RelationshipKind::ManyToOne,
    )
    .local_key("favorite_book_id")
    .cascade(Cascade::ALL)
    .related(relationships_of::<Book>)];

    fn key(&self) -> Key {
        self.id.clone()
    }

    fn set_key(&mut self, key: Key) {
        self.id = key;
    }

    fn foreign_key(&self, column: &str) -> Key {
        match column {
            "favorite_book_id" => self.favorite_book_id.clone(),
            _ => Key::None,
        }
    }

    fn set_foreign_key(&mut self, column: &str, key: Key) {
        if column == "favorite_book_id" {
            self.favorite_book_id = key;
        }
    }

    fn walk<W: LinkWalker>(&mut self, walker: &mut W) -> std::result::Result<(), W::Error> {
        walker.single(SingleLink {
            info: &Self::RELATIONSHIPS[0],
            fk: Some(&mut self.favorite_book_id),
            nav: &mut self.favorite_book,
        })
    }
}

impl Record for Book {
    const TABLE: &'static str = "books";
    const PRIMARY_KEY: &'static str = "id";
    const AUTO_KEY: bool = true;
    const RELATIONSHIPS: &'static [RelationshipInfo] = &[RelationshipInfo::new(
        "author",
        "authors",
        RelationshipKind::ManyToOne,
    )
    .local_key("author_id")
    .cascade(Cascade::ALL)
    .related(relationships_of::<Author>)];

    fn key(&self) -> Key {
        self.id.clone()
    }

    fn set_key(&mut self, key: Key) {
        self.id = key;
    }

    fn foreign_key(&self, column: &str) -> Key {
        match column {
            "author_id" => self.author_id.clone(),
            _ => Key::None,
        }
    }

    fn set_foreign_key(&mut self, column: &str, key: Key) {
        if column == "author_id" {
            self.author_id = key;
        }
    }

    fn walk<W: LinkWalker>(&mut self, walker: &mut W) -> std::result::Result<(), W::Error> {
        walker.single(SingleLink {
            info: &Self::RELATIONSHIPS[0],
            fk: Some(&mut self.author_id),
            nav: &mut self.author,
        })
    }
}

// ---------------------------------------------------------------------------
// Setup helpers
// ---------------------------------------------------------------------------

pub fn shop_db() -> Db<MemoryStore> {
    let db = Db::new(MemoryStore::new());
    db.create_table::<Customer>().unwrap();
    db.create_table::<Order>().unwrap();
    db
}

pub fn team_db() -> Db<MemoryStore> {
    let db = Db::new(MemoryStore::new());
    db.create_table::<Team>().unwrap();
    db.create_table::<Profile>().unwrap();
    db
}

pub fn school_db() -> Db<MemoryStore> {
    let db = Db::new(MemoryStore::new());
    db.create_table::<Student>().unwrap();
    db.create_table::<Course>().unwrap();
    db
}

pub fn library_db() -> Db<MemoryStore> {
    let db = Db::new(MemoryStore::new());
    db.create_table::<Author>().unwrap();
    db.create_table::<Book>().unwrap();
    db
}
