//! Text rendering of listings, details and evolution chains.

use std::fmt::Write;
use std::sync::Arc;

use crossterm::style::{Color, Stylize};
use indoc::formatdoc;
use itertools::Itertools;
use pokeapi_client::types::{Ability, CatalogItemDetail, Stat, TypeSlot};
use pokedex_sdk::models::browser::ListingView;
use pokedex_sdk::models::evolution::{EvolutionData, EvolutionStage};
use pokedex_sdk::models::session::ViewMode;
use pokedex_sdk::utils::format::{
    format_height,
    format_item_id,
    format_item_name,
    format_stat_name,
    format_weight,
};

/// Highest possible base stat, the full length of a stat bar.
const MAX_BASE_STAT: u8 = 255;
const STAT_BAR_WIDTH: usize = 30;
const GRID_COLUMNS: usize = 4;
const GRID_CELL_WIDTH: usize = 22;

pub fn type_color(type_name: &str) -> Color {
    let (r, g, b) = match type_name {
        "fire" => (0xEE, 0x81, 0x30),
        "water" => (0x63, 0x90, 0xF0),
        "electric" => (0xF7, 0xD0, 0x2C),
        "grass" => (0x7A, 0xC7, 0x4C),
        "ice" => (0x96, 0xD9, 0xD6),
        "fighting" => (0xC2, 0x2E, 0x28),
        "poison" => (0xA3, 0x3E, 0xA1),
        "ground" => (0xE2, 0xBF, 0x65),
        "flying" => (0xA9, 0x8F, 0xF3),
        "psychic" => (0xF9, 0x55, 0x87),
        "bug" => (0xA6, 0xB9, 0x1A),
        "rock" => (0xB6, 0xA1, 0x36),
        "ghost" => (0x73, 0x57, 0x97),
        "dragon" => (0x6F, 0x35, 0xFC),
        "dark" => (0x70, 0x57, 0x46),
        "steel" => (0xB7, 0xB7, 0xCE),
        "fairy" => (0xD6, 0x85, 0xAD),
        // normal and anything unknown
        _ => (0xA8, 0xA7, 0x7A),
    };
    Color::Rgb { r, g, b }
}

/// A type name coloured by type.
pub fn type_badge(type_name: &str) -> String {
    format_item_name(type_name)
        .with(type_color(type_name))
        .to_string()
}

fn type_badges(types: &[TypeSlot]) -> String {
    types
        .iter()
        .map(|slot| type_badge(&slot.name))
        .join(" ")
}

/// The whole listing, including pagination and failure notes.
pub fn render_listing(view: &ListingView, view_mode: ViewMode) -> String {
    match view {
        ListingView::Loading {
            progress_percent,
            elapsed,
        } => format!(
            "Loading Pokémon... {progress_percent}% ({:.1}s)",
            elapsed.as_secs_f64()
        ),
        ListingView::Failed { message } => format!("Failed to load Pokémon: {message}"),
        ListingView::Empty { searched: true } => {
            "No Pokémon match the current search and filters.".to_string()
        },
        ListingView::Empty { searched: false } => "The catalog is empty.".to_string(),
        ListingView::Ready {
            items,
            failed,
            page,
            total_pages,
            total_items,
        } => {
            let mut out = match view_mode {
                ViewMode::Grid => render_grid(items),
                ViewMode::List => render_list(items),
            };
            let _ = write!(
                out,
                "\n{}",
                format!("Page {page} of {total_pages} ({total_items} Pokémon)").dim()
            );
            if *failed > 0 {
                let _ = write!(out, "\n{failed} Pokémon could not be loaded.");
            }
            out
        },
    }
}

/// Cards of two lines, [GRID_COLUMNS] per row.
pub fn render_grid(items: &[Arc<CatalogItemDetail>]) -> String {
    let mut out = String::new();
    for row in &items.iter().chunks(GRID_COLUMNS) {
        let row = row.collect::<Vec<_>>();
        let titles = row
            .iter()
            .map(|item| {
                let title = format!("{} {}", format_item_id(item.id), format_item_name(&item.name));
                format!("{title:<GRID_CELL_WIDTH$}").bold().to_string()
            })
            .join("  ");
        let types = row
            .iter()
            .map(|item| {
                let types = format!("{:<GRID_CELL_WIDTH$}", item.type_names().join("/"));
                match item.types.first() {
                    Some(slot) => types.with(type_color(&slot.name)).to_string(),
                    None => types,
                }
            })
            .join("  ");
        let _ = writeln!(out, "{}", titles.trim_end());
        let _ = writeln!(out, "{}", types.trim_end());
        out.push('\n');
    }
    out.trim_end().to_string()
}

/// One line per item with id, name, types and measures.
pub fn render_list(items: &[Arc<CatalogItemDetail>]) -> String {
    items
        .iter()
        .map(|item| {
            format!(
                "{:<6} {:<16} {:<18} {:>8} {:>9}",
                format_item_id(item.id),
                format_item_name(&item.name),
                item.type_names().join(", "),
                format_height(item.height),
                format_weight(item.weight),
            )
            .trim_end()
            .to_string()
        })
        .join("\n")
}

pub fn render_detail(item: &CatalogItemDetail) -> String {
    let base_experience = item
        .base_experience
        .map(|exp| exp.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let artwork = item
        .sprites
        .artwork
        .as_deref()
        .or(item.sprites.primary.as_deref())
        .unwrap_or("none");

    formatdoc! {"
        {id} {name}
        {types}

        Height:          {height}
        Weight:          {weight}
        Base experience: {base_experience}
        Artwork:         {artwork}

        Abilities
        {abilities}

        Base stats
        {stats}",
        id = format_item_id(item.id).dim(),
        name = format_item_name(&item.name).bold(),
        types = type_badges(&item.types),
        height = format_height(item.height),
        weight = format_weight(item.weight),
        abilities = render_abilities(&item.abilities),
        stats = render_stats(&item.stats),
    }
}

/// Regular abilities first, hidden abilities last.
pub fn render_abilities(abilities: &[Ability]) -> String {
    if abilities.is_empty() {
        return "  none".to_string();
    }
    abilities
        .iter()
        .sorted_by_key(|ability| ability.is_hidden)
        .map(|ability| {
            let name = format_item_name(&ability.name);
            if ability.is_hidden {
                format!("  {name} {}", "(hidden)".dim())
            } else {
                format!("  {name}")
            }
        })
        .join("\n")
}

/// A bar per stat, scaled to [MAX_BASE_STAT], followed by the total.
pub fn render_stats(stats: &[Stat]) -> String {
    let mut lines = stats
        .iter()
        .map(|stat| {
            let filled = usize::from(stat.base_value) * STAT_BAR_WIDTH / usize::from(MAX_BASE_STAT);
            format!(
                "  {:<8} {:>3} {}{}",
                format_stat_name(&stat.name),
                stat.base_value,
                "█".repeat(filled),
                "░".repeat(STAT_BAR_WIDTH - filled).dim(),
            )
        })
        .collect::<Vec<_>>();
    let total = stats.iter().map(|stat| u32::from(stat.base_value)).sum::<u32>();
    lines.push(format!("  {:<8} {total:>3}", "Total"));
    lines.join("\n")
}

fn render_stage(stage: &EvolutionStage) -> String {
    let name = format!("{} {}", format_item_id(stage.id), format_item_name(&stage.name));
    match (stage.min_level, &stage.trigger_name) {
        (Some(level), _) => format!("{name} (Lv. {level})"),
        (None, Some(trigger)) => format!("{name} ({})", format_item_name(trigger)),
        (None, None) => name,
    }
}

/// One line per root-to-leaf path.
pub fn render_evolution(data: &EvolutionData) -> String {
    match data {
        EvolutionData::Unavailable => "Evolution data is unavailable.".to_string(),
        EvolutionData::Paths(paths) if paths.iter().all(|path| path.len() < 2) => {
            "This Pokémon does not evolve.".to_string()
        },
        EvolutionData::Paths(paths) => paths
            .iter()
            .map(|path| path.iter().map(render_stage).join(" → "))
            .join("\n"),
    }
}
