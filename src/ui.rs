use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, FocusPane, Role};

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: body, chip row, input, status line
    let [body_area, chips_area, input_area, status_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    // Body: transcript on the left, cart on the right
    let [transcript_area, cart_area] = Layout::horizontal([
        Constraint::Percentage(65),
        Constraint::Percentage(35),
    ])
    .areas(body_area);

    render_transcript(app, frame, transcript_area);
    render_cart(app, frame, cart_area);
    render_chips(app, frame, chips_area);
    render_input(app, frame, input_area);
    render_status(app, frame, status_area);
}

fn render_transcript(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.transcript_height = area.height.saturating_sub(2);
    app.transcript_width = area.width.saturating_sub(2);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Chat ");

    let transcript_text = if app.transcript.is_empty() && !app.request_in_flight() {
        Text::from(Span::styled(
            "Ask the shop assistant for a product...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in &app.transcript {
            match msg.role {
                Role::User => {
                    lines.push(Line::from(Span::styled(
                        "You:",
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    )));
                }
                Role::Bot => {
                    lines.push(Line::from(Span::styled(
                        "Bot:",
                        Style::default()
                            .fg(Color::Yellow)
                            .add_modifier(Modifier::BOLD),
                    )));
                }
            }
            for line in msg.text.lines() {
                lines.push(Line::from(line));
            }
            lines.push(Line::default());
        }

        if app.request_in_flight() {
            lines.push(Line::from(Span::styled(
                "Bot:",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let transcript = Paragraph::new(transcript_text)
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.transcript_scroll, 0));

    frame.render_widget(transcript, area);
}

fn render_cart(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Cart ");

    // The backend owns this markup; it is shown exactly as delivered
    let cart_text = match &app.cart_markup {
        Some(markup) => Text::from(
            markup
                .lines()
                .map(Line::from)
                .collect::<Vec<_>>(),
        ),
        None => Text::from(Span::styled(
            "Cart is empty.",
            Style::default().fg(Color::DarkGray),
        )),
    };

    let cart = Paragraph::new(cart_text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.cart_scroll, 0));

    frame.render_widget(cart, area);
}

fn render_chips(app: &mut App, frame: &mut Frame, area: Rect) {
    let chips_focused = app.focus == FocusPane::Suggestions;
    let border_color = if chips_focused {
        Color::Cyan
    } else {
        Color::DarkGray
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Suggestions (Tab to focus, Enter or click to add) ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    // Chip rects are recorded every frame for mouse hit-testing
    app.chip_areas.clear();

    let mut x = inner.x;
    for i in 0..app.suggestions.len() {
        let label = format!(" {} ", app.suggestions[i].text);
        let label_width = label.chars().count() as u16;
        let remaining = (inner.x + inner.width).saturating_sub(x);
        if remaining == 0 {
            break;
        }

        let chip_area = Rect {
            x,
            y: inner.y,
            width: label_width.min(remaining),
            height: 1,
        };

        let style = if chips_focused && app.selected_chip == Some(i) {
            Style::default().fg(Color::Black).bg(Color::Yellow)
        } else {
            Style::default().fg(Color::Yellow)
        };

        frame.render_widget(Paragraph::new(label).style(style), chip_area);
        app.chip_areas.push(chip_area);

        x += chip_area.width + 1;
    }
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let input_focused = app.focus == FocusPane::Input;

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if input_focused {
            Color::Yellow
        } else {
            Color::DarkGray
        }))
        .title(" Message ");

    let input = Paragraph::new(app.input.as_str())
        .style(Style::default().fg(Color::Cyan))
        .block(block);

    frame.render_widget(input, area);

    // Show cursor when the input box has focus
    if input_focused {
        frame.set_cursor_position((area.x + app.cursor as u16 + 1, area.y + 1));
    }
}

fn render_status(app: &App, frame: &mut Frame, area: Rect) {
    let status = if let Some(err) = &app.last_error {
        Line::from(Span::styled(
            format!(" Error: {}", err),
            Style::default().fg(Color::Red),
        ))
    } else if app.request_in_flight() {
        Line::from(Span::styled(
            " Contacting the shop...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Line::from(Span::styled(
            " Enter: send · Tab: suggestions · Esc: quit",
            Style::default().fg(Color::DarkGray),
        ))
    };

    frame.render_widget(Paragraph::new(status), area);
}
