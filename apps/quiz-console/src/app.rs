//! Application state and logic.

use crate::auth::{self, AccountOutcome};
use crate::catalog;
use crate::config::Config;
use crate::db::{Database, DbResult};
use crate::input;
use crate::models::{Category, CategorySelection, CategorySort, CategoryStanding, NewQuestion, Player};
use crate::sampler;
use crate::session::{QuizSession, QuizSummary, SessionState};
use crossterm::event::{KeyCode, KeyEvent};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};

pub struct App {
    pub db: Database,
    pub config: Config,
    pub view: View,
    pub player: Option<Player>,
    pub menu_index: usize,
    pub board: Vec<CategoryStanding>,
    pub board_sort: CategorySort,
    pub board_purpose: BoardPurpose,
    pub managed: Vec<ManagedCategory>,
    pub selected_category: usize,
    pub selection: CategorySelection,
    pub session: Option<QuizSession<StdRng>>,
    pub answer_buffer: String,
    pub summary: Option<QuizSummary>,
    pub editing: bool,
    pub input_buffer: String,
    pub input_field: InputField,
    pub confirm_delete: bool,
    pub message: Option<String>,
    pub show_help: bool,
    pub should_quit: bool,
    draft: Draft,
    graded_at: Option<Instant>,
    rng: StdRng,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Welcome,
    MainMenu,
    Categories,
    Quiz,
    Results,
    Manage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardPurpose {
    Browse,
    Play,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputField {
    None,
    Username,
    Password,
    CategorySelection,
    QuestionCount,
    NewCategory,
    RenameCategory,
    QuestionText,
    CorrectAnswer,
    IncorrectAnswers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    SignIn,
    CreateAccount,
    PlayAsGuest,
    Play,
    ViewCategories,
    ManageCategories,
    LogOut,
    Exit,
}

impl MenuItem {
    pub fn label(&self) -> &'static str {
        match self {
            Self::SignIn => "Sign In",
            Self::CreateAccount => "Create Account",
            Self::PlayAsGuest => "Play as Guest",
            Self::Play => "Play",
            Self::ViewCategories => "View Categories",
            Self::ManageCategories => "Modify Categories",
            Self::LogOut => "Log out",
            Self::Exit => "Exit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthMode {
    SignIn,
    CreateAccount,
}

/// Text collected across multi-step prompts.
#[derive(Debug, Clone)]
struct Draft {
    auth: AuthMode,
    username: String,
    question_text: String,
    correct_answer: String,
}

impl Default for Draft {
    fn default() -> Self {
        Self {
            auth: AuthMode::SignIn,
            username: String::new(),
            question_text: String::new(),
            correct_answer: String::new(),
        }
    }
}

/// A category row on the administration screen.
#[derive(Debug, Clone)]
pub struct ManagedCategory {
    pub category: Category,
    pub questions: usize,
}

impl App {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let db_path = config.db_path().unwrap_or_else(|| "quiz.db".into());
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::open(&db_path)?;
        tracing::info!(path = %db_path.display(), "database opened");

        if config.database.seed_sample_questions {
            db.seed_sample_questions()?;
        }

        Ok(Self::with_database(db, config))
    }

    pub fn with_database(db: Database, config: Config) -> Self {
        let rng = match config.quiz.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            db,
            config,
            view: View::Welcome,
            player: None,
            menu_index: 0,
            board: Vec::new(),
            board_sort: CategorySort::default(),
            board_purpose: BoardPurpose::Browse,
            managed: Vec::new(),
            selected_category: 0,
            selection: CategorySelection::default(),
            session: None,
            answer_buffer: String::new(),
            summary: None,
            editing: false,
            input_buffer: String::new(),
            input_field: InputField::None,
            confirm_delete: false,
            message: None,
            show_help: false,
            should_quit: false,
            draft: Draft::default(),
            graded_at: None,
            rng,
        }
    }

    /// `q` exits only from the menus; elsewhere it is typed or means "back".
    pub fn can_quit(&self) -> bool {
        !self.editing && matches!(self.view, View::Welcome | View::MainMenu)
    }

    pub fn status_line(&self) -> String {
        match &self.player {
            Some(Player::Guest) => {
                "Signed in as Guest (Your quiz stats won't be tracked until you sign in)".to_string()
            }
            Some(Player::Member(user)) => format!("Signed in as {}", user.username),
            None => "Not signed in".to_string(),
        }
    }

    pub fn menu_items(&self) -> Vec<MenuItem> {
        match self.view {
            View::Welcome => vec![
                MenuItem::SignIn,
                MenuItem::CreateAccount,
                MenuItem::PlayAsGuest,
                MenuItem::Exit,
            ],
            View::MainMenu => {
                let mut items = vec![MenuItem::Play, MenuItem::ViewCategories];
                if self.is_admin() {
                    items.push(MenuItem::ManageCategories);
                }
                items.push(MenuItem::LogOut);
                items.push(MenuItem::Exit);
                items
            }
            _ => Vec::new(),
        }
    }

    fn is_admin(&self) -> bool {
        self.player.as_ref().is_some_and(Player::is_admin)
    }

    pub fn input_title(&self) -> String {
        match self.input_field {
            InputField::Username => match self.draft.auth {
                AuthMode::SignIn => "Enter username".to_string(),
                AuthMode::CreateAccount => "Enter preferred username".to_string(),
            },
            InputField::Password => match self.draft.auth {
                AuthMode::SignIn => "Enter password".to_string(),
                AuthMode::CreateAccount => "Enter preferred password".to_string(),
            },
            InputField::CategorySelection => {
                "Select categories (write the number, divide by commas)".to_string()
            }
            InputField::QuestionCount => format!(
                "How many questions would you like? ({}-{})",
                self.config.quiz.min_questions, self.config.quiz.max_questions
            ),
            InputField::NewCategory => "Enter the name of the new category".to_string(),
            InputField::RenameCategory => "Enter the new category name".to_string(),
            InputField::QuestionText => "Enter a question".to_string(),
            InputField::CorrectAnswer => "Enter the correct answer".to_string(),
            InputField::IncorrectAnswers => {
                "Enter two incorrect answers, separated by a comma".to_string()
            }
            InputField::None => String::new(),
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        self.message = None;

        if self.show_help {
            self.show_help = false;
            return;
        }

        if self.editing {
            self.handle_edit_key(key);
            return;
        }

        match self.view {
            View::Welcome | View::MainMenu => self.handle_menu_key(key),
            View::Categories => self.handle_categories_key(key),
            View::Quiz => self.handle_quiz_key(key),
            View::Results => self.handle_results_key(key),
            View::Manage => self.handle_manage_key(key),
        }
    }

    /// Advance past answer feedback once its delay has passed.
    pub fn tick(&mut self) {
        let Some(graded_at) = self.graded_at else { return };
        let delay = Duration::from_millis(self.config.quiz.feedback_delay_ms);
        if graded_at.elapsed() >= delay {
            self.advance_quiz();
        }
    }

    fn begin_input(&mut self, field: InputField) {
        self.editing = true;
        self.input_field = field;
        self.input_buffer.clear();
    }

    fn end_input(&mut self) {
        self.editing = false;
        self.input_field = InputField::None;
        self.input_buffer.clear();
    }

    fn handle_edit_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.end_input(),
            KeyCode::Enter => self.finish_editing(),
            KeyCode::Backspace => {
                self.input_buffer.pop();
            }
            KeyCode::Char(c) => self.input_buffer.push(c),
            _ => {}
        }
    }

    fn handle_menu_key(&mut self, key: KeyEvent) {
        let items = self.menu_items();
        if items.is_empty() {
            return;
        }
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.menu_index = (self.menu_index + 1).min(items.len() - 1);
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.menu_index = self.menu_index.saturating_sub(1);
            }
            KeyCode::Enter => {
                let item = items[self.menu_index.min(items.len() - 1)];
                self.activate(item);
            }
            KeyCode::Char(c) if c.is_ascii_digit() => {
                let choice = c.to_digit(10).unwrap_or(0) as usize;
                match choice.checked_sub(1).and_then(|i| items.get(i)) {
                    Some(&item) => self.activate(item),
                    None => self.message = Some("Invalid option. Please try again.".to_string()),
                }
            }
            KeyCode::Char('?') => self.show_help = true,
            _ => {}
        }
    }

    fn activate(&mut self, item: MenuItem) {
        match item {
            MenuItem::SignIn => {
                self.draft.auth = AuthMode::SignIn;
                self.begin_input(InputField::Username);
            }
            MenuItem::CreateAccount => {
                self.draft.auth = AuthMode::CreateAccount;
                self.begin_input(InputField::Username);
            }
            MenuItem::PlayAsGuest => {
                self.enter_main_menu(Player::Guest);
                self.message = Some("You are now playing as a guest.".to_string());
            }
            MenuItem::Play => self.open_board(BoardPurpose::Play),
            MenuItem::ViewCategories => self.open_board(BoardPurpose::Browse),
            MenuItem::ManageCategories => self.open_manage(),
            MenuItem::LogOut => {
                if let Some(player) = self.player.take() {
                    tracing::info!(player = player.display_name(), "logged out");
                }
                self.view = View::Welcome;
                self.menu_index = 0;
                self.message = Some("Logged out successfully.".to_string());
            }
            MenuItem::Exit => self.should_quit = true,
        }
    }

    fn enter_main_menu(&mut self, player: Player) {
        self.player = Some(player);
        self.view = View::MainMenu;
        self.menu_index = 0;
    }

    fn back_to_main_menu(&mut self) {
        self.view = View::MainMenu;
        self.menu_index = 0;
    }

    fn report_storage_error(&mut self, context: &str, error: impl std::fmt::Display) {
        tracing::error!(error = %error, "{}", context);
        self.message = Some(format!("{}: {}", context, error));
    }

    // Category board

    fn load_board(&mut self) -> DbResult<()> {
        let user = self.player.as_ref().and_then(Player::user_id);
        self.board = self.db.category_standings(user)?;
        self.board_sort = CategorySort::SuccessRate;
        Ok(())
    }

    fn open_board(&mut self, purpose: BoardPurpose) {
        if let Err(e) = self.load_board() {
            self.board.clear();
            self.report_storage_error("Error loading categories", e);
            return;
        }
        if purpose == BoardPurpose::Play && self.board.is_empty() {
            self.message = Some("No categories available yet.".to_string());
            return;
        }
        self.board_purpose = purpose;
        self.view = View::Categories;
    }

    pub fn sort_board(&mut self, sort: CategorySort) {
        catalog::sort_board(&mut self.board, sort, &mut self.rng);
        self.board_sort = sort;
    }

    fn handle_categories_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('a') => self.sort_board(CategorySort::Alphabetical),
            KeyCode::Char('r') => self.sort_board(CategorySort::Random),
            KeyCode::Char('s') => self.sort_board(CategorySort::SuccessRate),
            KeyCode::Enter if self.board_purpose == BoardPurpose::Play => {
                self.begin_input(InputField::CategorySelection);
            }
            KeyCode::Char('q') | KeyCode::Esc => self.back_to_main_menu(),
            KeyCode::Char('?') => self.show_help = true,
            _ => {}
        }
    }

    // Quiz

    fn start_quiz(&mut self, total: usize) {
        let mut rng = StdRng::seed_from_u64(self.rng.gen());
        let started = sampler::sample(&self.db, &mut rng, &self.selection, total)
            .and_then(|plan| QuizSession::start(plan, total, rng));

        match started {
            Ok(session) => {
                self.session = Some(session);
                self.summary = None;
                self.answer_buffer.clear();
                self.graded_at = None;
                self.view = View::Quiz;
            }
            Err(e) => {
                tracing::error!(error = %e, "could not start quiz");
                self.message = Some(e.to_string());
            }
        }
    }

    fn handle_quiz_key(&mut self, key: KeyEvent) {
        let Some(session) = &mut self.session else {
            self.back_to_main_menu();
            return;
        };

        match session.state() {
            SessionState::Presenting(_) => match key.code {
                KeyCode::Enter => {
                    session.submit(&self.answer_buffer);
                    self.answer_buffer.clear();
                    self.graded_at = Some(Instant::now());
                }
                KeyCode::Backspace => {
                    self.answer_buffer.pop();
                }
                KeyCode::Char(c) => self.answer_buffer.push(c),
                _ => {}
            },
            SessionState::Grading(_) => self.advance_quiz(),
            SessionState::Completed => self.complete_quiz(),
        }
    }

    fn advance_quiz(&mut self) {
        self.graded_at = None;
        let Some(session) = &mut self.session else { return };
        if session.advance() == SessionState::Completed {
            self.complete_quiz();
        }
    }

    fn complete_quiz(&mut self) {
        let Some(session) = self.session.take() else { return };
        let player = self.player.clone().unwrap_or(Player::Guest);

        let summary = match session.finish(&player, &self.db, self.config.stats.upsert) {
            Ok(summary) => summary,
            Err(session) => {
                self.session = Some(session);
                return;
            }
        };
        if let Some(stats) = &summary.stats {
            if !stats.is_complete() {
                self.message = Some(format!(
                    "Stats could not be saved for {} categor{}.",
                    stats.failed.len(),
                    if stats.failed.len() == 1 { "y" } else { "ies" }
                ));
            }
        }
        self.summary = Some(summary);
        self.view = View::Results;
    }

    fn handle_results_key(&mut self, _key: KeyEvent) {
        self.summary = None;
        self.back_to_main_menu();
    }

    // Category administration

    fn refresh_managed(&mut self) -> DbResult<()> {
        let mut managed = Vec::new();
        for category in self.db.list_categories()? {
            let questions = self.db.question_count(category.id)?;
            managed.push(ManagedCategory { category, questions });
        }
        self.managed = managed;
        if self.selected_category >= self.managed.len() {
            self.selected_category = self.managed.len().saturating_sub(1);
        }
        Ok(())
    }

    fn open_manage(&mut self) {
        if !self.is_admin() {
            self.message = Some("You do not have permission to perform this action.".to_string());
            return;
        }
        match self.refresh_managed() {
            Ok(()) => self.view = View::Manage,
            Err(e) => self.report_storage_error("Error fetching categories", e),
        }
    }

    pub fn selected_managed(&self) -> Option<&ManagedCategory> {
        self.managed.get(self.selected_category)
    }

    fn handle_manage_key(&mut self, key: KeyEvent) {
        if self.confirm_delete {
            self.confirm_delete = false;
            if matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
                self.delete_selected();
            }
            return;
        }

        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                if !self.managed.is_empty() {
                    self.selected_category = (self.selected_category + 1).min(self.managed.len() - 1);
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.selected_category = self.selected_category.saturating_sub(1);
            }
            KeyCode::Char('n') => self.begin_input(InputField::NewCategory),
            KeyCode::Char('r') if self.selected_managed().is_some() => {
                self.begin_input(InputField::RenameCategory);
            }
            KeyCode::Char('a') if self.selected_managed().is_some() => {
                self.begin_input(InputField::QuestionText);
            }
            KeyCode::Char('d') if self.selected_managed().is_some() => self.confirm_delete = true,
            KeyCode::Char('q') | KeyCode::Esc => self.back_to_main_menu(),
            KeyCode::Char('?') => self.show_help = true,
            _ => {}
        }
    }

    fn delete_selected(&mut self) {
        let Some(selected) = self.selected_managed().cloned() else { return };
        match self.db.delete_category(selected.category.id) {
            Ok(true) => {
                tracing::info!(category = selected.category.id, "category deleted");
                self.message = Some(format!("Category '{}' deleted successfully.", selected.category.name));
            }
            Ok(false) => self.message = Some("Failed to delete category.".to_string()),
            Err(e) => self.report_storage_error("Error deleting category", e),
        }
        if let Err(e) = self.refresh_managed() {
            self.report_storage_error("Error fetching categories", e);
        }
    }

    // Text entry

    fn finish_editing(&mut self) {
        let text = self.input_buffer.clone();
        match self.input_field {
            InputField::Username => {
                self.draft.username = text.trim().to_string();
                self.begin_input(InputField::Password);
                return;
            }
            InputField::Password => self.submit_credentials(&text),
            InputField::CategorySelection => {
                let positions = input::parse_category_selection(&text, self.board.len());
                let selection = CategorySelection::from_positions(&positions, &self.board);
                if selection.is_empty() {
                    self.message = Some("Please select at least one listed category.".to_string());
                    self.input_buffer.clear();
                    return;
                }
                self.selection = selection;
                self.begin_input(InputField::QuestionCount);
                return;
            }
            InputField::QuestionCount => {
                let quiz = &self.config.quiz;
                let parsed = input::parse_question_count(&text, quiz.min_questions, quiz.max_questions);
                let total = parsed.unwrap_or(quiz.default_questions);
                self.end_input();
                self.start_quiz(total);
                if parsed.is_none() && self.message.is_none() {
                    self.message = Some(format!("Invalid input. Setting number of questions to {}.", total));
                }
                return;
            }
            InputField::NewCategory => self.submit_new_category(text.trim()),
            InputField::RenameCategory => self.submit_rename(text.trim()),
            InputField::QuestionText => {
                self.draft.question_text = text.trim().to_string();
                self.begin_input(InputField::CorrectAnswer);
                return;
            }
            InputField::CorrectAnswer => {
                self.draft.correct_answer = text.trim().to_string();
                self.begin_input(InputField::IncorrectAnswers);
                return;
            }
            InputField::IncorrectAnswers => {
                let Some(incorrect_answers) = input::parse_incorrect_answers(&text) else {
                    self.message = Some("Enter exactly two incorrect answers, separated by a comma.".to_string());
                    self.input_buffer.clear();
                    return;
                };
                self.submit_question(incorrect_answers);
            }
            InputField::None => {}
        }
        self.end_input();
    }

    fn submit_credentials(&mut self, password: &str) {
        let username = std::mem::take(&mut self.draft.username);
        match self.draft.auth {
            AuthMode::SignIn => match auth::sign_in(&self.db, &username, password) {
                Ok(Some(user)) => {
                    self.enter_main_menu(Player::Member(user));
                    self.message = Some("Sign-in successful!".to_string());
                }
                Ok(None) => self.message = Some("Invalid username or password.".to_string()),
                Err(e) => self.report_storage_error("Error signing in", e),
            },
            AuthMode::CreateAccount => {
                let is_admin = self.config.is_admin_name(&username);
                match auth::create_account(&self.db, &username, password, is_admin) {
                    Ok(AccountOutcome::Created) => {
                        self.message = Some("Account created successfully, you can now sign in.".to_string());
                    }
                    Ok(AccountOutcome::UsernameTaken) => {
                        self.message = Some("Username already exists. Please choose a different one.".to_string());
                    }
                    Ok(AccountOutcome::Invalid(reason)) => self.message = Some(reason.to_string()),
                    Err(e) => self.report_storage_error("Error creating account", e),
                }
            }
        }
    }

    fn submit_new_category(&mut self, name: &str) {
        if name.is_empty() {
            self.message = Some("Category name cannot be empty.".to_string());
            return;
        }
        match self.db.add_category(name) {
            Ok(true) => {
                tracing::info!(name, "category added");
                self.message = Some(format!("Category '{}' added successfully!", name));
            }
            Ok(false) => {
                self.message = Some("Category already exists. Please choose a different name.".to_string());
            }
            Err(e) => self.report_storage_error("Error adding category", e),
        }
        if let Err(e) = self.refresh_managed() {
            self.report_storage_error("Error fetching categories", e);
        }
    }

    fn submit_rename(&mut self, new_name: &str) {
        let Some(selected) = self.selected_managed().cloned() else { return };
        if new_name.is_empty() {
            self.message = Some("Category name cannot be empty.".to_string());
            return;
        }
        match self.db.rename_category(selected.category.id, new_name) {
            Ok(true) => {
                tracing::info!(from = %selected.category.name, to = new_name, "category renamed");
                self.message = Some(format!("Category name changed to {}.", new_name));
            }
            Ok(false) => self.message = Some("Failed to change category name.".to_string()),
            Err(e) => self.report_storage_error("Error changing category name", e),
        }
        if let Err(e) = self.refresh_managed() {
            self.report_storage_error("Error fetching categories", e);
        }
    }

    fn submit_question(&mut self, incorrect_answers: [String; 2]) {
        let Some(selected) = self.selected_managed().cloned() else { return };
        let question = NewQuestion {
            text: std::mem::take(&mut self.draft.question_text),
            correct_answer: std::mem::take(&mut self.draft.correct_answer),
            incorrect_answers,
        };
        if question.text.is_empty() || question.correct_answer.is_empty() {
            self.message = Some("Question and correct answer cannot be empty.".to_string());
            return;
        }
        match self.db.add_question(selected.category.id, &question) {
            Ok(id) => {
                tracing::info!(question = id, category = selected.category.id, "question added");
                self.message = Some("Question added to the category successfully.".to_string());
            }
            Err(e) => self.report_storage_error("Error adding question", e),
        }
        if let Err(e) = self.refresh_managed() {
            self.report_storage_error("Error fetching categories", e);
        }
    }
}
