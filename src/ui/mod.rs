/// View building blocks for the two panes
pub mod grid;
pub mod panel;

use iced::widget::{button, container, horizontal_space, row, text};
use iced::{Alignment, Element, Length};

use crate::Message;

/// Top bar: folder button, current folder and status text
pub fn toolbar<'a>(folder: Option<String>, status: &'a str) -> Element<'a, Message> {
    let folder_label = folder.unwrap_or_else(|| "No folder".to_string());

    container(
        row![
            button("Open Folder")
                .on_press(Message::OpenFolder)
                .padding(10),
            text(folder_label).size(14),
            horizontal_space(),
            text(status).size(14),
        ]
        .spacing(16)
        .align_y(Alignment::Center),
    )
    .padding(10)
    .width(Length::Fill)
    .style(container::rounded_box)
    .into()
}
