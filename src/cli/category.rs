use anyhow::Result;
use chrono::Utc;
use clap::Subcommand;

use crate::{
    storage::category_storage::{default_category, CategoryRegistry},
    tracker::entities::{Category, CategoryId, Color},
};

use super::{output::swatch, AppContext};

#[derive(Debug, Subcommand)]
pub enum CategoryCommand {
    #[command(about = "List categories, the selected one is marked with *")]
    List,
    #[command(about = "Add a category. Without --color one is generated")]
    Add {
        name: String,
        #[arg(long, help = "Color as #rrggbb, #rgb or hsl(h, s%, l%)")]
        color: Option<Color>,
        #[arg(long, help = "Select the new category right away")]
        select: bool,
    },
    #[command(about = "Rename a category. Past sessions keep the old name")]
    Rename { id: String, name: String },
    #[command(about = "Change the color of a category")]
    Recolor { id: String, color: Color },
    #[command(about = "Delete a category. Past sessions keep its name and color")]
    Delete { id: String },
    #[command(about = "Select the category the timer records")]
    Select { id: String },
}

pub fn process_category_command(context: &AppContext, command: CategoryCommand) -> Result<()> {
    let store = context.categories();
    match command {
        CategoryCommand::List => {
            print_categories(&store.load()?);
        }
        CategoryCommand::Add {
            name,
            color,
            select,
        } => {
            let added = store.update(|registry| {
                let category = registry.add(&name, color, Utc::now())?;
                if select {
                    registry.select(&category.id)?;
                }
                Ok(category)
            })?;
            println!("Added {}", describe(&added));
        }
        CategoryCommand::Rename { id, name } => {
            store.update(|registry| registry.rename(&CategoryId::new(id), &name))?;
        }
        CategoryCommand::Recolor { id, color } => {
            store.update(|registry| registry.recolor(&CategoryId::new(id), color))?;
        }
        CategoryCommand::Delete { id } => {
            let removed = store.update(|registry| registry.delete(&CategoryId::new(id)))?;
            println!("Deleted {}", describe(&removed));
        }
        CategoryCommand::Select { id } => {
            let selected = store.update(|registry| registry.select(&CategoryId::new(id)))?;
            println!("Selected {}", describe(&selected));
        }
    }
    Ok(())
}

fn print_categories(registry: &CategoryRegistry) {
    let active = registry.active();
    let all = std::iter::once(default_category()).chain(registry.list().iter().cloned());
    for category in all {
        let marker = if category.id == active.id { "*" } else { " " };
        println!("{marker} {}", describe(&category));
    }
}

fn describe(category: &Category) -> String {
    format!(
        "{} {}\t{}\t{}",
        swatch(category.color),
        category.id,
        category.color,
        category.name
    )
}
