use ratatui::{
    buffer::Buffer,
    layout::{ Alignment, Constraint, Direction, Layout, Rect },
    style::{ palette::tailwind, Color, Style },
    symbols,
    text::{ Span, Text },
    widgets::{
        block::Title,
        Axis,
        Block,
        Borders,
        Cell,
        Chart,
        Dataset,
        Gauge,
        GraphType,
        HighlightSpacing,
        Padding,
        Paragraph,
        Row,
        Table,
        Widget,
    },
    DefaultTerminal,
};
use std::sync::PoisonError;
use crossterm::event::{ self, Event, KeyCode, KeyEventKind };
use std::time::Duration;
use color_eyre::Result;
use ratatui::prelude::Stylize;

use crate::state::{ EvalState, StateMutex };

const CUSTOM_LABEL_COLOR: Color = tailwind::SLATE.c200;

#[derive(Debug)]
pub struct App {
    pub state: AppState,
    pub eval_state: StateMutex,
    pub scroll_position: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    #[default]
    Running,
    Quitting,
}

impl App {
    pub fn run(mut self, mut terminal: DefaultTerminal) -> Result<()> {
        while self.state != AppState::Quitting {
            terminal.draw(|frame| frame.render_widget(&self, frame.area()))?;
            self.handle_events()?;
        }
        Ok(())
    }

    fn handle_events(&mut self) -> Result<()> {
        let timeout = Duration::from_secs_f32(1.0 / 20.0);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => self.quit(),
                        KeyCode::Down => {
                            self.scroll_position = self.scroll_position.saturating_add(1);
                        }
                        KeyCode::Up => {
                            self.scroll_position = self.scroll_position.saturating_sub(1);
                        }
                        _ => {}
                    }
                }
            }
        }
        Ok(())
    }

    fn quit(&mut self) {
        self.state = AppState::Quitting;
    }

    fn snapshot(&self) -> EvalState {
        self.eval_state.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let eval_state = self.snapshot();

        let body = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([Constraint::Max(1), Constraint::Fill(2), Constraint::Max(1)].as_ref())
            .split(area);

        let container = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([Constraint::Length(3), Constraint::Fill(1)].as_ref())
            .split(body[1]);

        let section_info = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)].as_ref())
            .split(container[1]);

        let section_tables = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(8), Constraint::Fill(1)].as_ref())
            .split(section_info[1]);

        render_header(body[0], buf);
        render_footer(body[2], buf, eval_state.finished);
        render_progress(&eval_state, container[0], buf);
        render_curves(&eval_state, section_info[0], buf);
        render_table_topk(&eval_state, section_tables[0], buf);
        self.render_table_history(&eval_state, section_tables[1], buf);
    }
}

fn render_header(area: Rect, buf: &mut Buffer) {
    Paragraph::new("Selective Prediction Evaluation")
        .bold()
        .alignment(Alignment::Left)
        .fg(CUSTOM_LABEL_COLOR)
        .render(area, buf);
}

fn render_footer(area: Rect, buf: &mut Buffer, finished: bool) {
    let text = if finished { "Done. Press q to quit" } else { "Evaluating... (q to quit)" };
    Paragraph::new(text)
        .alignment(Alignment::Center)
        .fg(CUSTOM_LABEL_COLOR)
        .bold()
        .render(area, buf);
}

fn render_progress(eval_state: &EvalState, area: Rect, buf: &mut Buffer) {
    let progress = &eval_state.progress;
    Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Batch Progress"))
        .gauge_style(Style::default().fg(Color::Green))
        .label(
            format!(
                "batch {}/{} - {}/{} samples",
                progress.current_batch,
                progress.max_batch,
                progress.samples_seen,
                progress.total_samples
            )
        )
        .ratio(progress.ratio())
        .render(area, buf);
}

fn render_curves(eval_state: &EvalState, area: Rect, buf: &mut Buffer) {
    let curves = &eval_state.curves;
    let max_rate = curves.final_accuracy
        .iter()
        .chain(curves.average_final_accuracy.iter())
        .map(|(rate, _)| *rate)
        .fold(1.0_f64, f64::max);

    let final_dataset = Dataset::default()
        .name("final accuracy")
        .marker(symbols::Marker::Braille)
        .style(Style::default().fg(Color::Green))
        .graph_type(GraphType::Line)
        .data(&curves.final_accuracy);

    let average_dataset = Dataset::default()
        .name("average final accuracy")
        .marker(symbols::Marker::Braille)
        .style(Style::default().fg(Color::Yellow))
        .graph_type(GraphType::Line)
        .data(&curves.average_final_accuracy);

    Chart::new(vec![final_dataset, average_dataset])
        .block(Block::default().borders(Borders::ALL).title("Accuracy vs verification rate"))
        .x_axis(
            Axis::default()
                .title("Verified (%)")
                .bounds([0.0, max_rate])
                .labels(vec![Span::raw("0"), Span::raw(format!("{max_rate:.0}"))])
                .style(Style::default().fg(Color::Gray))
        )
        .y_axis(
            Axis::default()
                .title("Accuracy (%)")
                .bounds([0.0, 100.0])
                .labels(vec![Span::raw("0"), Span::raw("50"), Span::raw("100")])
                .style(Style::default().fg(Color::Gray))
        )
        .render(area, buf);
}

fn render_table_topk(eval_state: &EvalState, area: Rect, buf: &mut Buffer) {
    let title = title_block("Top-k Accuracy");

    let header = Row::new(vec![Cell::from(Text::raw("Metric")), Cell::from(Text::raw("Value"))])
        .style(Style::default())
        .height(1);

    let rows = eval_state.topk.iter().map(|(metric, value)| {
        vec![Cell::from(metric.clone()), Cell::from(value.clone())]
            .into_iter()
            .collect::<Row>()
            .height(1)
    });
    Table::new(rows, [Constraint::Length(10), Constraint::Min(1)])
        .header(header)
        .block(title)
        .highlight_spacing(HighlightSpacing::Always)
        .render(area, buf);
}

impl App {
    fn render_table_history(&self, eval_state: &EvalState, area: Rect, buf: &mut Buffer) {
        let title = title_block("History");

        let skip = self.scroll_position.min(eval_state.history.len().saturating_sub(1));
        let rows = eval_state.history
            .iter()
            .rev()
            .skip(skip)
            .map(|(info, value)| {
                Row::new(vec![Cell::from(info.clone()), Cell::from(value.clone())]).height(1)
            });

        let header = Row::new(vec![Cell::from("Info"), Cell::from("Accuracy")])
            .style(Style::default())
            .height(1);

        Table::new(rows, [Constraint::Percentage(70), Constraint::Percentage(30)])
            .header(header)
            .block(title)
            .render(area, buf);
    }
}

fn title_block(title: &str) -> Block {
    let title = Title::from(title).alignment(Alignment::Center);
    Block::new()
        .padding(Padding::vertical(1))
        .title(title)
        .borders(Borders::ALL)
        .fg(CUSTOM_LABEL_COLOR)
}
