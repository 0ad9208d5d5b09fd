//! Database seeding functionality
//!
//! Seeds the category tree and the department list with a small baseline so a
//! fresh installation can accept signals immediately. Existing rows are left
//! alone, matching is done on slug and code.

use anyhow::Result;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::models::{Category, Department, category, department};

struct CategorySeed {
    slug: &'static str,
    name: &'static str,
    handling_message: Option<&'static str>,
    children: &'static [CategorySeed],
}

struct DepartmentSeed {
    code: &'static str,
    name: &'static str,
}

const CATEGORIES: &[CategorySeed] = &[
    CategorySeed {
        slug: "afval",
        name: "Afval",
        handling_message: None,
        children: &[
            CategorySeed {
                slug: "huisafval",
                name: "Huisafval",
                handling_message: Some(
                    "We pick up household waste within three working days.",
                ),
                children: &[],
            },
            CategorySeed {
                slug: "grofvuil",
                name: "Grofvuil",
                handling_message: None,
                children: &[],
            },
        ],
    },
    CategorySeed {
        slug: "wegen-verkeer-straatmeubilair",
        name: "Wegen, verkeer, straatmeubilair",
        handling_message: None,
        children: &[CategorySeed {
            slug: "straatverlichting",
            name: "Straatverlichting",
            handling_message: Some("Broken street lights are repaired within five working days."),
            children: &[],
        }],
    },
    CategorySeed {
        slug: "overig",
        name: "Overig",
        handling_message: None,
        children: &[CategorySeed {
            slug: "overig-subcategorie",
            name: "Overig",
            handling_message: None,
            children: &[],
        }],
    },
];

const DEPARTMENTS: &[DepartmentSeed] = &[
    DepartmentSeed {
        code: "ASC",
        name: "Actie Service Centrum",
    },
    DepartmentSeed {
        code: "STW",
        name: "Stadswerken",
    },
    DepartmentSeed {
        code: "THO",
        name: "Toezicht en Handhaving Openbare Ruimte",
    },
];

/// Seeds the categories and departments tables with baseline data.
pub async fn seed_reference_data(db: &DatabaseConnection) -> Result<()> {
    for seed in CATEGORIES {
        let parent_id = ensure_category(db, seed, None).await?;
        for child in seed.children {
            ensure_category(db, child, Some(parent_id)).await?;
        }
    }

    for seed in DEPARTMENTS {
        let existing = Department::find()
            .filter(department::Column::Code.eq(seed.code))
            .one(db)
            .await?;
        if existing.is_some() {
            log::info!("Department '{}' already exists, skipping", seed.code);
            continue;
        }
        log::info!("Creating department: {}", seed.code);
        department::ActiveModel {
            code: Set(seed.code.to_string()),
            name: Set(seed.name.to_string()),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    Ok(())
}

async fn ensure_category(
    db: &DatabaseConnection,
    seed: &CategorySeed,
    parent_id: Option<i64>,
) -> Result<i64> {
    let existing = Category::find()
        .filter(category::Column::Slug.eq(seed.slug))
        .filter(match parent_id {
            Some(id) => category::Column::ParentId.eq(id),
            None => category::Column::ParentId.is_null(),
        })
        .one(db)
        .await?;
    if let Some(found) = existing {
        log::info!("Category '{}' already exists, skipping", seed.slug);
        return Ok(found.id);
    }

    log::info!("Creating category: {}", seed.slug);
    let created = category::ActiveModel {
        slug: Set(seed.slug.to_string()),
        name: Set(seed.name.to_string()),
        public_name: Set(None),
        parent_id: Set(parent_id),
        handling_message: Set(seed.handling_message.map(str::to_string)),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(created.id)
}
