/// Detail panel: metadata of the selected file and the date editor
use iced::widget::{button, column, container, horizontal_rule, row, scrollable, text, text_input};
use iced::{Alignment, Element, Length};

use crate::state::catalog::LOADING_LABEL;
use crate::state::detail::{DetailStatus, DetailView};
use crate::Message;

const LABEL_WIDTH: f32 = 120.0;

pub fn view(detail: Option<&DetailView>) -> Element<'_, Message> {
    let Some(detail) = detail else {
        return container(text("Select a file to see its metadata").size(14))
            .center_x(Length::Fill)
            .center_y(Length::Fill)
            .into();
    };

    let mut rows = column![text("Details").size(20)].spacing(6);
    for (label, value) in detail.fields() {
        rows = rows.push(field_row(label, value));
    }
    match detail.status() {
        DetailStatus::Loading => rows = rows.push(text(LOADING_LABEL).size(13)),
        DetailStatus::Unavailable => {
            rows = rows.push(text("No metadata could be read from this file").size(13))
        }
        DetailStatus::Loaded => {}
    }

    let editable = detail.can_save();
    let date_input = text_input("YYYY-MM-DD HH:MM:SS", detail.editor())
        .on_input_maybe(editable.then_some(Message::DateEdited))
        .on_submit_maybe(editable.then_some(Message::SaveDate))
        .padding(6);

    let save_label = if detail.is_saving() { "Saving..." } else { "Save Date" };
    let save = button(text(save_label))
        .padding([6, 14])
        .on_press_maybe(editable.then_some(Message::SaveDate));

    let editor = column![
        text("Date Taken").size(16),
        date_input,
        text(detail.source_label()).size(12),
        save,
    ]
    .spacing(8);

    let content = column![rows, horizontal_rule(1.0), editor]
        .spacing(16)
        .padding(16)
        .width(Length::Fill);

    scrollable(content).height(Length::Fill).into()
}

fn field_row<'a>(label: &'a str, value: &'a str) -> Element<'a, Message> {
    row![
        text(label).size(13).width(Length::Fixed(LABEL_WIDTH)),
        text(value).size(13),
    ]
    .spacing(8)
    .align_y(Alignment::Start)
    .into()
}
