//! UI rendering for the quiz console.

use crate::app::{App, BoardPurpose, InputField, View};
use crate::models::{CategoryId, Player};
use crate::session::SessionState;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Row, Table, Wrap},
    Frame,
};

pub fn draw(f: &mut Frame, app: &App) {
    match app.view {
        View::Welcome | View::MainMenu => draw_menu(f, app),
        View::Categories => draw_categories(f, app),
        View::Quiz => draw_quiz(f, app),
        View::Results => draw_results(f, app),
        View::Manage => draw_manage(f, app),
    }

    if app.show_help {
        draw_help(f);
    }

    if app.editing {
        draw_input(f, app);
    }

    if let Some(msg) = &app.message {
        draw_message(f, msg);
    }
}

fn screen(f: &Frame) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(3)])
        .split(f.area())
}

fn header(f: &mut Frame, area: Rect, title: &str) {
    let header = Paragraph::new(title)
        .style(Style::default().add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn footer(f: &mut Frame, area: Rect, keys: &str) {
    let footer = Paragraph::new(keys)
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, area);
}

fn draw_menu(f: &mut Frame, app: &App) {
    let chunks = screen(f);

    let title = match app.view {
        View::Welcome => "Welcome to the Quiz Console".to_string(),
        _ => format!("Quiz Console | {}", app.status_line()),
    };
    header(f, chunks[0], &title);

    let items: Vec<ListItem> = app
        .menu_items()
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let style = if i == app.menu_index {
                Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!("{}. {}", i + 1, item.label())).style(style)
        })
        .collect();

    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(" Menu "));
    f.render_widget(list, chunks[1]);

    footer(f, chunks[2], "j/k:Navigate  Enter/1-9:Select  ?:Help  q:Quit");
}

fn draw_categories(f: &mut Frame, app: &App) {
    let chunks = screen(f);

    let title = match app.board_purpose {
        BoardPurpose::Play => "Choose Categories",
        BoardPurpose::Browse => "Categories",
    };
    header(f, chunks[0], title);

    if app.board.is_empty() {
        let msg = Paragraph::new("No categories found.")
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(msg, chunks[1]);
    } else {
        let rows: Vec<Row> = app
            .board
            .iter()
            .enumerate()
            .map(|(i, standing)| {
                Row::new(vec![
                    format!("{}.", i + 1),
                    standing.category.name.clone(),
                    format!("{:.2}%", standing.success_rate),
                ])
            })
            .collect();

        let table = Table::new(
            rows,
            [Constraint::Length(5), Constraint::Percentage(60), Constraint::Percentage(30)],
        )
        .header(Row::new(vec!["Nr", "Category", "Success rate"]).style(Style::default().add_modifier(Modifier::BOLD)))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Sorted by {} ", app.board_sort.label())),
        );
        f.render_widget(table, chunks[1]);
    }

    let keys = match app.board_purpose {
        BoardPurpose::Play => "Enter:Select  s:By success  a:Alphabetical  r:Random  q:Back",
        BoardPurpose::Browse => "s:By success  a:Alphabetical  r:Random  q:Back",
    };
    footer(f, chunks[2], keys);
}

fn draw_quiz(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Progress
            Constraint::Min(0),    // Question
            Constraint::Length(3), // Answer / feedback
        ])
        .split(f.area());

    let Some(session) = &app.session else { return };

    let position = match session.state() {
        SessionState::Presenting(i) | SessionState::Grading(i) => i,
        SessionState::Completed => session.planned(),
    };
    let progress = Paragraph::new(format!(
        "Question {} of {} | Correct so far: {}",
        position,
        session.planned(),
        session.performance().total_correct()
    ))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(progress, chunks[0]);

    if let Some(presented) = session.current() {
        let mut lines = vec![
            Line::from(Span::styled(
                format!("Category: {}", category_name(app, presented.question.category_id)),
                Style::default().fg(Color::Cyan),
            )),
            Line::from(Span::styled(
                presented.question.text.as_str(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
        ];
        lines.extend(
            presented
                .options
                .iter()
                .enumerate()
                .map(|(i, option)| Line::from(format!("  {}. {}", i + 1, option))),
        );

        let question = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(" Question "))
            .wrap(Wrap { trim: false });
        f.render_widget(question, chunks[1]);
    }

    let bottom = match (session.state(), session.last_outcome()) {
        (SessionState::Grading(_), Some(outcome)) if outcome.correct => {
            Paragraph::new("Correct!").style(Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
        }
        (SessionState::Grading(_), Some(outcome)) => Paragraph::new(format!(
            "Incorrect. The correct answer was {}.",
            outcome.correct_answer
        ))
        .style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
        _ => Paragraph::new(format!("Enter your answer (1-3): {}", app.answer_buffer))
            .style(Style::default().fg(Color::Yellow)),
    };
    f.render_widget(bottom.block(Block::default().borders(Borders::ALL)), chunks[2]);
}

fn category_name(app: &App, category: CategoryId) -> &str {
    app.board
        .iter()
        .find(|s| s.category.id == category)
        .map(|s| s.category.name.as_str())
        .unwrap_or("Unknown category")
}

fn draw_results(f: &mut Frame, app: &App) {
    let chunks = screen(f);
    header(f, chunks[0], "Quiz Completed");

    if let Some(summary) = &app.summary {
        let mut lines = vec![
            Line::from(Span::styled(
                format!(
                    "You got {} out of {} questions correct.",
                    summary.correct, summary.requested
                ),
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
        ];
        if summary.answered as usize != summary.requested {
            lines.push(Line::from(format!(
                "Only {} questions were available for your selection.",
                summary.answered
            )));
        }
        for (category, tally) in summary.performance.iter() {
            let name = category_name(app, category);
            lines.push(Line::from(format!(
                "  {}: {}/{} ({:.2}%)",
                name,
                tally.correct,
                tally.attempted,
                tally.success_rate()
            )));
        }
        if app.player.as_ref().is_some_and(Player::is_guest) {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "Sign in to keep track of your success rates.",
                Style::default().fg(Color::DarkGray),
            )));
        }

        let body = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL))
            .wrap(Wrap { trim: true });
        f.render_widget(body, chunks[1]);
    }

    footer(f, chunks[2], "Press any key to return to the menu");
}

fn draw_manage(f: &mut Frame, app: &App) {
    let chunks = screen(f);
    header(f, chunks[0], "Modify Categories");

    let rows: Vec<Row> = app
        .managed
        .iter()
        .enumerate()
        .map(|(i, managed)| {
            let style = if i == app.selected_category {
                Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Row::new(vec![
                format!("{}.", i + 1),
                managed.category.name.clone(),
                managed.questions.to_string(),
            ])
            .style(style)
        })
        .collect();

    let table = Table::new(
        rows,
        [Constraint::Length(5), Constraint::Percentage(60), Constraint::Percentage(30)],
    )
    .header(Row::new(vec!["Nr", "Category", "Questions"]).style(Style::default().add_modifier(Modifier::BOLD)))
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(table, chunks[1]);

    let keys = if app.confirm_delete {
        match app.selected_managed() {
            Some(m) => format!("Delete '{}' and all its questions? (y/n)", m.category.name),
            None => String::new(),
        }
    } else {
        "j/k:Navigate  n:New  r:Rename  a:Add question  d:Delete  q:Back".to_string()
    };
    footer(f, chunks[2], &keys);
}

fn draw_help(f: &mut Frame) {
    let area = centered_rect(60, 80, f.area());
    f.render_widget(Clear, area);

    let help = r#"
Quiz Console Keybindings

Menus:
  j/k, Up/Down    Navigate
  Enter, 1-9      Choose an option
  q               Quit

Categories:
  s / a / r       Sort by success rate, name, randomly
  Enter           Select categories to play
  q, Esc          Back

Quiz:
  1-3, Enter      Answer the question
  any key         Continue after feedback

Modify Categories:
  n / r / d       New, rename, delete category
  a               Add a question
  q, Esc          Back

Press any key to close
"#;

    let popup = Paragraph::new(help)
        .block(Block::default().borders(Borders::ALL).title(" Help "))
        .wrap(Wrap { trim: false });
    f.render_widget(popup, area);
}

fn draw_input(f: &mut Frame, app: &App) {
    let area = centered_rect(60, 15, f.area());
    f.render_widget(Clear, area);

    let shown = if app.input_field == InputField::Password {
        "*".repeat(app.input_buffer.chars().count())
    } else {
        app.input_buffer.clone()
    };

    let input = Paragraph::new(shown.as_str())
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL).title(format!(" {} ", app.input_title())));
    f.render_widget(input, area);

    f.set_cursor_position((area.x + 1 + shown.chars().count() as u16, area.y + 1));
}

fn draw_message(f: &mut Frame, msg: &str) {
    let area = Rect::new(
        f.area().x + 2,
        f.area().height.saturating_sub(5),
        f.area().width.saturating_sub(4),
        3,
    );
    f.render_widget(Clear, area);

    let message = Paragraph::new(msg)
        .style(Style::default().fg(Color::Cyan))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(message, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
