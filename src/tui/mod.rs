use std::io::{self, IsTerminal};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::Paragraph;
use ratatui::{Frame, Terminal};

use view::{Row, RowList, StatusLine, TitleBar};

use crate::error::Error;
use crate::nav::Fold;
use crate::params::Item;
use crate::session::{Action, Session};
use crate::transport::LineLink;

const TITLE: &str = "Synth control";
const ROW_HEIGHT: u16 = 2;
/// Columns per nesting level.
const INDENT: u16 = 2;
const PAGE: isize = 5;
const BIG_STEP: f64 = 5.0;
const HINTS: &str =
    "+/- fold  space rec  h/l adjust  s save  o load  x reset  r reload  c clear  q quit";

/// Take over the terminal and drive `session` until the user quits or the
/// connection fails. The terminal is restored on every exit path.
pub fn run<L: LineLink + ?Sized>(
    session: &mut Session<'_, L>,
    addr: &str,
    log_to_file: bool,
) -> anyhow::Result<()> {
    crossterm::terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Log lines on a terminal stderr would land in the middle of the screen.
    let prev_log_level = log::max_level();
    if !log_to_file && io::stderr().is_terminal() {
        log::set_max_level(log::LevelFilter::Off);
    }

    let result = event_loop(&mut terminal, session, addr);

    log::set_max_level(prev_log_level);

    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    crossterm::terminal::disable_raw_mode()?;
    terminal.show_cursor()?;

    result
}

fn event_loop<L: LineLink + ?Sized>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    session: &mut Session<'_, L>,
    addr: &str,
) -> anyhow::Result<()> {
    loop {
        terminal.draw(|frame| draw(frame, session, addr))?;
        if session.should_quit() {
            return Ok(());
        }
        if !session.is_connected() {
            return Err(Error::Disconnected.into());
        }

        // Poll with a timeout so a dropped connection is noticed while idle.
        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if let Some(action) = action_for(key) {
                session.handle(action)?;
            }
        }
    }
}

/// Key bindings.
pub fn action_for(key: KeyEvent) -> Option<Action> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return (key.code == KeyCode::Char('c')).then_some(Action::Quit);
    }

    let action = match key.code {
        KeyCode::Up | KeyCode::Char('k') => Action::MoveBy(-1),
        KeyCode::Down | KeyCode::Char('j') => Action::MoveBy(1),
        KeyCode::PageUp => Action::MoveBy(-PAGE),
        KeyCode::PageDown => Action::MoveBy(PAGE),
        KeyCode::Home => Action::MoveToStart,
        KeyCode::End => Action::MoveToEnd,

        KeyCode::Char('+') => Action::Fold(Fold::Unfold),
        KeyCode::Char('-') => Action::Fold(Fold::Fold),
        KeyCode::Enter => Action::Fold(Fold::Toggle),
        KeyCode::Char(' ') => Action::Activate,

        KeyCode::Left | KeyCode::Char('h') => Action::Adjust(-1.0),
        KeyCode::Right | KeyCode::Char('l') => Action::Adjust(1.0),
        KeyCode::Char('H') | KeyCode::Char('D') => Action::Adjust(-BIG_STEP),
        KeyCode::Char('L') | KeyCode::Char('C') => Action::Adjust(BIG_STEP),

        KeyCode::Char('c') => Action::ClearInstruments,
        KeyCode::Char('r') => Action::ReloadInstruments,
        KeyCode::Char('s') => Action::SaveParams,
        KeyCode::Char('o') => Action::LoadParams,
        KeyCode::Char('x') => Action::ResetParams,
        KeyCode::Char('q') => Action::Quit,
        _ => return None,
    };
    Some(action)
}

/// Entries that fit on a screen `height` rows tall: title, spacer, status
/// and footer take four rows, every entry takes two.
pub fn view_rows(height: u16) -> usize {
    (height.saturating_sub(4) / ROW_HEIGHT).max(1) as usize
}

struct RowText {
    indent: u16,
    label: String,
    value: Option<(String, f64)>,
}

fn row_texts<L: LineLink + ?Sized>(session: &Session<'_, L>) -> Vec<RowText> {
    let tree = session.tree();
    session
        .nav()
        .view()
        .iter()
        .filter_map(|entry| {
            let item = tree.get(&entry.path)?;
            let value = match item {
                Item::Param(p) => Some((p.display_value(), p.fraction())),
                Item::Group(_) => None,
            };
            Some(RowText {
                indent: entry.indent as u16 * INDENT,
                label: item.name().to_string(),
                value,
            })
        })
        .collect()
}

fn draw<L: LineLink + ?Sized>(frame: &mut Frame, session: &mut Session<'_, L>, addr: &str) {
    let area = frame.area();
    session.set_max_rows(view_rows(area.height));

    let [title_area, _, list_area, status_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Fill(1),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(area);

    let detail = format!("[{addr}]");
    let mut title = TitleBar::new(TITLE).detail(&detail);
    if session.is_recording() {
        title = title.badge(
            " RECORDING ",
            Style::default()
                .fg(Color::White)
                .bg(Color::Red)
                .add_modifier(Modifier::BOLD),
        );
    }
    frame.render_widget(title, title_area);

    let texts = row_texts(session);
    let rows: Vec<Row> = texts
        .iter()
        .map(|t| match &t.value {
            Some((text, fraction)) => Row::value(t.indent, &t.label, text, *fraction),
            None => Row::header(t.indent, &t.label),
        })
        .collect();
    let nav = session.nav();
    frame.render_widget(
        RowList::new(&rows, nav.selection(), nav.offset()).row_height(ROW_HEIGHT),
        list_area,
    );

    if let Some(status) = session.status() {
        let text = format!(" {}", status.message);
        frame.render_widget(StatusLine::new(&text, status.ok), status_area);
    }

    let footer = nav
        .selected(session.tree())
        .and_then(Item::as_param)
        .map(|p| p.desc.as_str())
        .filter(|d| !d.is_empty())
        .unwrap_or(HINTS);
    frame.render_widget(
        Paragraph::new(footer).style(Style::default().fg(Color::DarkGray)),
        footer_area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlator::testing::ScriptedLink;
    use crate::session::Timeouts;
    use ratatui::backend::TestBackend;
    use ratatui::buffer::Buffer;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn line(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width)
            .map(|x| buf[(x, y)].symbol().to_string())
            .collect()
    }

    #[test]
    fn key_bindings() {
        assert_eq!(action_for(press(KeyCode::Up)), Some(Action::MoveBy(-1)));
        assert_eq!(action_for(press(KeyCode::Char('j'))), Some(Action::MoveBy(1)));
        assert_eq!(action_for(press(KeyCode::PageDown)), Some(Action::MoveBy(5)));
        assert_eq!(
            action_for(press(KeyCode::Enter)),
            Some(Action::Fold(Fold::Toggle))
        );
        assert_eq!(action_for(press(KeyCode::Char('H'))), Some(Action::Adjust(-5.0)));
        assert_eq!(action_for(press(KeyCode::Char('C'))), Some(Action::Adjust(5.0)));
        assert_eq!(
            action_for(press(KeyCode::Char('c'))),
            Some(Action::ClearInstruments)
        );
        assert_eq!(action_for(press(KeyCode::Char('o'))), Some(Action::LoadParams));
        assert_eq!(action_for(press(KeyCode::Char('z'))), None);
    }

    #[test]
    fn ctrl_c_quits_and_releases_are_ignored() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(action_for(ctrl_c), Some(Action::Quit));

        let ctrl_r = KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL);
        assert_eq!(action_for(ctrl_r), None);

        let mut release = press(KeyCode::Char('q'));
        release.kind = KeyEventKind::Release;
        assert_eq!(action_for(release), None);
    }

    #[test]
    fn rows_for_height() {
        assert_eq!(view_rows(24), 10);
        assert_eq!(view_rows(25), 10);
        assert_eq!(view_rows(5), 1);
        assert_eq!(view_rows(0), 1);
    }

    #[test]
    fn draws_title_rows_and_footer() {
        let link = ScriptedLink::new();
        link.reply(
            "list_params",
            &[
                "lead.gain,0.5,NUMBER,0,1,0.25,Output level",
                "lead.wave,saw(1),CHOICE,sine;saw,Waveform",
                "OK",
            ],
        );
        link.reply("record status", &["running", "OK"]);
        let mut session = Session::start(&link, Timeouts::default(), 1).unwrap();

        let mut terminal = Terminal::new(TestBackend::new(80, 10)).unwrap();
        terminal
            .draw(|frame| draw(frame, &mut session, "127.0.0.1:10000"))
            .unwrap();
        assert_eq!(session.nav().max_rows(), 3);

        let buf = terminal.backend().buffer();
        let title = line(buf, 0);
        assert!(title.starts_with("Synth control  [127.0.0.1:10000]"));
        assert!(title.ends_with(" RECORDING "));

        let first = line(buf, 2);
        assert!(first.starts_with("-> gain"), "{first}");
        assert!(first.contains("+0.500"), "{first}");

        let second = line(buf, 4);
        assert!(second.starts_with("   wave"), "{second}");
        assert!(second.contains(" saw "), "{second}");

        assert!(line(buf, 9).starts_with("Output level"));
    }
}
