//! Renderable view model and its HTML form.
//!
//! The `data-testid` values and fixed texts below are the UI contract other
//! tooling selects on; keep them byte-exact.

use std::fmt::Write as _;

use shared::domain::Bill;

use crate::routes::Route;

pub mod testids {
    pub const FORM_NEW_BILL: &str = "form-new-bill";
    pub const EXPENSE_TYPE: &str = "expense-type";
    pub const EXPENSE_NAME: &str = "expense-name";
    pub const DATEPICKER: &str = "datepicker";
    pub const AMOUNT: &str = "amount";
    pub const VAT: &str = "vat";
    pub const PCT: &str = "pct";
    pub const COMMENTARY: &str = "commentary";
    pub const FILE: &str = "file";
    pub const BTN_SUBMIT: &str = "btn-submit";
    pub const ERROR_MESSAGE_FORM: &str = "error-message-form";
    pub const ERROR_MESSAGE: &str = "error-message";
    pub const ICON_WINDOW: &str = "icon-window";
    pub const ICON_MAIL: &str = "icon-mail";
    pub const LAYOUT_DISCONNECT: &str = "layout-disconnect";
    pub const BTN_NEW_BILL: &str = "btn-new-bill";
    pub const TBODY: &str = "tbody";
    pub const TR: &str = "tr";
    pub const ICON_EYE: &str = "icon-eye";
    pub const MODALE_FILE: &str = "modaleFile";
    pub const FORM_EMPLOYEE: &str = "form-employee";
    pub const FORM_ADMIN: &str = "form-admin";
}

pub const NEW_BILL_TITLE: &str = "Envoyer une note de frais";
pub const BILLS_TITLE: &str = "Mes notes de frais";
pub const DASHBOARD_TITLE: &str = "Validations";
pub const LOADING_TEXT: &str = "Loading...";
pub const UNAUTHORIZED_ACTION: &str = "unauthorized action";
pub const ACTIVE_ICON_CLASS: &str = "active-icon";

pub const EXPENSE_TYPES: [&str; 7] = [
    "Transports",
    "Restaurants et bars",
    "Hôtel et logement",
    "Services en ligne",
    "IT et électronique",
    "Equipement et matériel",
    "Fournitures de bureau",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthorized,
    FetchFailed(String),
}

impl ErrorKind {
    pub fn message(&self) -> &str {
        match self {
            ErrorKind::Unauthorized => UNAUTHORIZED_ACTION,
            ErrorKind::FetchFailed(detail) => detail,
        }
    }
}

/// DOM-side state of the new-bill form the core writes into.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewBillForm {
    pub error_message: String,
    pub file_input: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Blank,
    Login,
    Loading(Route),
    Error { route: Route, kind: ErrorKind },
    Bills(Vec<Bill>),
    NewBill(NewBillForm),
    Dashboard(Vec<Bill>),
}

/// Sidebar highlight: `layout-icon1` is the bills icon, `layout-icon2` the
/// new-bill icon.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutIcons {
    pub window_active: bool,
    pub mail_active: bool,
}

/// The single root region the router renders into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    view: View,
    icons: LayoutIcons,
    modal_url: Option<String>,
    generation: u64,
}

impl Default for Screen {
    fn default() -> Self {
        Self {
            view: View::Blank,
            icons: LayoutIcons::default(),
            modal_url: None,
            generation: 0,
        }
    }
}

impl Screen {
    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn icons(&self) -> LayoutIcons {
        self.icons
    }

    pub fn modal_url(&self) -> Option<&str> {
        self.modal_url.as_deref()
    }

    /// Bumped on every render. Controllers bound to an older generation write
    /// into a detached tree and their writes are dropped.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn form(&self) -> Option<&NewBillForm> {
        match &self.view {
            View::NewBill(form) => Some(form),
            _ => None,
        }
    }

    pub(crate) fn replace(&mut self, view: View) -> u64 {
        self.view = view;
        self.icons = LayoutIcons::default();
        self.modal_url = None;
        self.generation += 1;
        self.generation
    }

    pub(crate) fn highlight(&mut self, route: Route) {
        match route {
            Route::Bills => {
                self.icons.window_active = true;
                self.icons.mail_active = false;
            }
            Route::NewBill => {
                self.icons.window_active = false;
                self.icons.mail_active = true;
            }
            Route::Login | Route::Dashboard => {}
        }
    }

    pub(crate) fn form_mut(&mut self, generation: u64) -> Option<&mut NewBillForm> {
        if self.generation != generation {
            return None;
        }
        match &mut self.view {
            View::NewBill(form) => Some(form),
            _ => None,
        }
    }

    pub(crate) fn open_modal(&mut self, generation: u64, url: &str) -> bool {
        if self.generation != generation || !matches!(self.view, View::Bills(_)) {
            return false;
        }
        self.modal_url = Some(url.to_string());
        true
    }

    pub fn contains_text(&self, text: &str) -> bool {
        self.render().contains(&escape(text))
    }

    pub fn render(&self) -> String {
        match &self.view {
            View::Blank => String::new(),
            View::Login => render_login(),
            View::Loading(_) => with_layout(
                self.icons,
                &format!("<div class='content' id='loading'>{LOADING_TEXT}</div>"),
            ),
            View::Error { kind, .. } => with_layout(self.icons, &render_error(kind)),
            View::Bills(bills) => {
                with_layout(self.icons, &render_bills(bills, self.modal_url.as_deref()))
            }
            View::NewBill(form) => with_layout(self.icons, &render_new_bill(form)),
            View::Dashboard(bills) => with_layout(self.icons, &render_dashboard(bills)),
        }
    }
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn icon_class(active: bool) -> &'static str {
    if active {
        ACTIVE_ICON_CLASS
    } else {
        ""
    }
}

fn with_layout(icons: LayoutIcons, content: &str) -> String {
    format!(
        "<div class='layout'>\
<div class='vertical-navbar'>\
<div class='layout-title'> Billed </div>\
<div id='layout-icon1' data-testid='{window}' class='{window_class}'></div>\
<div id='layout-icon2' data-testid='{mail}' class='{mail_class}'></div>\
<div id='layout-disconnect' data-testid='{disconnect}'></div>\
</div>{content}</div>",
        window = testids::ICON_WINDOW,
        window_class = icon_class(icons.window_active),
        mail = testids::ICON_MAIL,
        mail_class = icon_class(icons.mail_active),
        disconnect = testids::LAYOUT_DISCONNECT,
    )
}

fn render_login() -> String {
    format!(
        "<div class='login-page'>\
<form data-testid='{employee}'>\
<h2>Employé</h2>\
<input type='email' data-testid='employee-email-input' />\
<input type='password' data-testid='employee-password-input' />\
<button type='submit' data-testid='employee-login-button'>Se connecter</button>\
</form>\
<form data-testid='{admin}'>\
<h2>Administration</h2>\
<input type='email' data-testid='admin-email-input' />\
<input type='password' data-testid='admin-password-input' />\
<button type='submit' data-testid='admin-login-button'>Se connecter</button>\
</form></div>",
        employee = testids::FORM_EMPLOYEE,
        admin = testids::FORM_ADMIN,
    )
}

fn render_error(kind: &ErrorKind) -> String {
    format!(
        "<div class='content'>\
<div class='content-header'><div class='content-title'> Erreur </div></div>\
<div data-testid='{id}'>{message}</div></div>",
        id = testids::ERROR_MESSAGE,
        message = escape(kind.message()),
    )
}

fn render_bills(bills: &[Bill], modal_url: Option<&str>) -> String {
    let mut rows = String::new();
    for bill in bills {
        let _ = write!(
            rows,
            "<tr data-testid='{tr}'><td>{kind}</td><td>{name}</td><td>{date}</td>\
<td>{amount} €</td><td>{status}</td>\
<td><div data-testid='{eye}' data-bill-url='{url}'></div></td></tr>",
            tr = testids::TR,
            kind = escape(&bill.expense_type),
            name = escape(&bill.name),
            date = escape(&bill.date),
            amount = bill.amount,
            status = bill.status.label(),
            eye = testids::ICON_EYE,
            url = escape(bill.file_url.as_deref().unwrap_or_default()),
        );
    }
    let modal_body = modal_url
        .map(|url| format!("<img src='{}' alt='Bill' />", escape(url)))
        .unwrap_or_default();
    format!(
        "<div class='content'>\
<div class='content-header'><div class='content-title'> {BILLS_TITLE} </div>\
<button type='button' data-testid='{new_bill}' class='btn btn-primary'>Nouvelle note de frais</button>\
</div>\
<div id='data-table'><table class='table'><thead><tr>\
<th>Type</th><th>Nom</th><th>Date</th><th>Montant</th><th>Statut</th><th>Actions</th>\
</tr></thead><tbody data-testid='{tbody}'>{rows}</tbody></table></div>\
<div class='modal' id='modaleFile' data-testid='{modal}'>{modal_body}</div></div>",
        new_bill = testids::BTN_NEW_BILL,
        tbody = testids::TBODY,
        modal = testids::MODALE_FILE,
    )
}

fn render_new_bill(form: &NewBillForm) -> String {
    let options: String = EXPENSE_TYPES
        .iter()
        .enumerate()
        .map(|(i, kind)| {
            if i == 0 {
                format!("<option selected>{kind}</option>")
            } else {
                format!("<option>{kind}</option>")
            }
        })
        .collect();
    format!(
        "<div class='content'>\
<div class='content-header'><div class='content-title'> {NEW_BILL_TITLE} </div></div>\
<form data-testid='{form_id}'>\
<select required data-testid='{expense_type}'>{options}</select>\
<input required type='text' data-testid='{expense_name}' placeholder='Vol Paris Londres' />\
<input required type='date' data-testid='{date}' />\
<input required type='number' data-testid='{amount}' placeholder='350' />\
<input type='number' data-testid='{vat}' placeholder='70' />\
<input required type='number' data-testid='{pct}' placeholder='20' />\
<textarea data-testid='{commentary}' rows='3'></textarea>\
<input required type='file' accept='image/png, image/jpg, image/jpeg' data-testid='{file}' value='{file_value}' />\
<button type='submit' id='btn-send-bill' data-testid='{submit}'>Envoyer</button>\
<p class='error-message-form' data-testid='{error}'>{error_message}</p>\
</form></div>",
        form_id = testids::FORM_NEW_BILL,
        expense_type = testids::EXPENSE_TYPE,
        expense_name = testids::EXPENSE_NAME,
        date = testids::DATEPICKER,
        amount = testids::AMOUNT,
        vat = testids::VAT,
        pct = testids::PCT,
        commentary = testids::COMMENTARY,
        file = testids::FILE,
        file_value = escape(&form.file_input),
        submit = testids::BTN_SUBMIT,
        error = testids::ERROR_MESSAGE_FORM,
        error_message = escape(&form.error_message),
    )
}

fn render_dashboard(bills: &[Bill]) -> String {
    let mut cards = String::new();
    for (index, bill) in bills.iter().enumerate() {
        let id = bill
            .id
            .as_ref()
            .map(|id| id.0.clone())
            .unwrap_or_else(|| index.to_string());
        let _ = write!(
            cards,
            "<div class='bill-card' id='open-bill{id}' data-testid='open-bill{id}'>\
<span>{email}</span><span>{name}</span><span>{date}</span>\
<span>{amount} €</span><span>{kind}</span><span>{status}</span></div>",
            id = escape(&id),
            email = escape(&bill.email),
            name = escape(&bill.name),
            date = escape(&bill.date),
            amount = bill.amount,
            kind = escape(&bill.expense_type),
            status = bill.status.label(),
        );
    }
    format!(
        "<div class='content'>\
<div class='content-header'><div class='content-title'> {DASHBOARD_TITLE} </div></div>\
<div class='dashboard-content'>{cards}</div></div>"
    )
}
