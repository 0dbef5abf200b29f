/// Thumbnail grid
/// Tiles wrap to the pane width; each one selects its file when clicked.
use iced::widget::{button, column, container, image, scrollable, text};
use iced::{Alignment, Element, Length, Pixels};
use iced_aw::Wrap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::state::catalog::{Catalog, CatalogEntry, LoadState, ThumbnailState};
use crate::Message;

/// Side of the square each preview is shown in
pub const TILE_SIZE: f32 = 180.0;

/// Grid of every catalog entry. `previews` holds the uploaded image
/// handles, keyed by entry path.
pub fn view<'a>(
    catalog: &'a Catalog,
    previews: &'a HashMap<PathBuf, image::Handle>,
    selected: Option<&Path>,
) -> Element<'a, Message> {
    if catalog.is_empty() {
        let hint = match catalog.state() {
            LoadState::Idle => "Open a folder to get started",
            LoadState::Enumerating => "Reading folder...",
            LoadState::Populated(_) => "No photos or videos in this folder",
        };
        return container(text(hint).size(16))
            .center_x(Length::Fill)
            .center_y(Length::Fill)
            .into();
    }

    let tiles: Vec<Element<'a, Message>> = catalog
        .entries()
        .iter()
        .map(|entry| {
            let is_selected = selected == Some(entry.path.as_path());
            tile(entry, previews.get(&entry.path), is_selected)
        })
        .collect();

    let wrap = Wrap::with_elements(tiles)
        .spacing(Pixels(8.0))
        .line_spacing(Pixels(8.0));

    scrollable(container(wrap).padding(10).width(Length::Fill))
        .height(Length::Fill)
        .into()
}

fn tile<'a>(
    entry: &'a CatalogEntry,
    preview: Option<&image::Handle>,
    is_selected: bool,
) -> Element<'a, Message> {
    let picture: Element<'a, Message> = match (preview, &entry.thumbnail) {
        (Some(handle), _) => image(handle.clone())
            .width(Length::Fixed(TILE_SIZE))
            .height(Length::Fixed(TILE_SIZE))
            .into(),
        (None, ThumbnailState::Failed(_)) => placeholder("No preview"),
        (None, _) => placeholder(""),
    };

    let content = column![
        picture,
        text(&entry.name).size(13),
        text(entry.date.to_string()).size(12),
    ]
    .spacing(4)
    .width(Length::Fixed(TILE_SIZE))
    .align_x(Alignment::Center);

    button(content)
        .padding(6)
        .style(if is_selected {
            button::primary
        } else {
            button::text
        })
        .on_press(Message::Select(entry.path.clone()))
        .into()
}

fn placeholder<'a>(label: &'a str) -> Element<'a, Message> {
    container(text(label).size(12))
        .center_x(Length::Fixed(TILE_SIZE))
        .center_y(Length::Fixed(TILE_SIZE))
        .style(container::rounded_box)
        .into()
}
