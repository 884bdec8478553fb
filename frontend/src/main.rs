mod api;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use gloo_events::EventListener;
use gloo_file::{File as GlooFile, ObjectUrl};
use gloo_storage::{LocalStorage, Storage};
use gloo_timers::callback::Timeout;
use shared::{
    BatchItemResult, BatchResponse, HealthResponse, Label, ModelInfoResponse, PredictResponse,
};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{ClipboardEvent, DragEvent, FileList, HtmlInputElement};
use yew::prelude::*;

/// Mirrors the server-side batch cap; the gallery never holds more than one
/// batch worth of images.
const MAX_FILES: usize = 10;

const THEME_STORAGE_KEY: &str = "classifier-theme";

#[derive(Clone)]
struct FileData {
    id: u64,
    file: GlooFile,
    preview_url: Option<ObjectUrl>,
}

/// What the result card needs, regardless of whether the numbers came from a
/// single prediction or a batch entry.
#[derive(Clone, PartialEq)]
struct DisplayResult {
    label: Label,
    confidence: f64,
    cat: f64,
    dog: f64,
}

impl From<&PredictResponse> for DisplayResult {
    fn from(response: &PredictResponse) -> Self {
        Self {
            label: response.prediction,
            confidence: response.confidence_percentage,
            cat: response.probabilities.cat,
            dog: response.probabilities.dog,
        }
    }
}

fn display_from_batch_item(item: &BatchItemResult) -> Result<DisplayResult, String> {
    match (item.prediction, item.confidence_percentage, item.probabilities) {
        (Some(label), Some(confidence), Some(probabilities)) if item.success => Ok(DisplayResult {
            label,
            confidence,
            cat: probabilities.cat,
            dog: probabilities.dog,
        }),
        _ => Err(item
            .error
            .clone()
            .unwrap_or_else(|| "Incomplete batch result".to_string())),
    }
}

enum Msg {
    // File operations
    FilesAdded(Vec<GlooFile>),
    AddPreview(u64, ObjectUrl),
    RemoveFile(u64),
    SelectFile(u64),
    ClearAllFiles,

    // Prediction operations
    AnalyzeSelected,
    AnalyzeAll,
    SingleResult(u64, Result<PredictResponse, String>),
    BatchResult(Vec<u64>, Result<BatchResponse, String>),

    // Backend status
    HealthLoaded(Option<HealthResponse>),
    ModelInfoLoaded(Option<ModelInfoResponse>),

    // UI states
    SetError(Option<String>),
    SetDragging(bool),
    ToggleTheme,

    // Input events
    HandleDrop(DragEvent),
    HandlePaste(ClipboardEvent),
}

struct App {
    files: HashMap<u64, FileData>,
    selected_file_id: Option<u64>,
    results: HashMap<u64, Result<DisplayResult, String>>,
    loading: bool,
    error: Option<String>,
    is_dragging: bool,
    paste_listener: Option<EventListener>,
    theme: String,
    health: Option<HealthResponse>,
    model_info: Option<ModelInfoResponse>,
}

fn generate_id() -> u64 {
    (js_sys::Date::now() * 1000.0 + js_sys::Math::random() * 1000.0) as u64
}

fn debounce<F>(duration: u32, callback: F) -> Callback<MouseEvent>
where
    F: Fn() + Clone + 'static,
{
    let timeout = Rc::new(RefCell::new(None::<Timeout>));
    let timeout_clone = Rc::clone(&timeout);

    Callback::from(move |_| {
        let mut timeout_ref = timeout_clone.borrow_mut();

        if let Some(old_timeout) = timeout_ref.take() {
            old_timeout.cancel();
        }

        let inner_callback = callback.clone();
        *timeout_ref = Some(Timeout::new(duration, move || {
            inner_callback();
        }));
    })
}

impl Component for App {
    type Message = Msg;
    type Properties = ();

    fn create(ctx: &Context<Self>) -> Self {
        let theme: String =
            LocalStorage::get(THEME_STORAGE_KEY).unwrap_or_else(|_| "light".to_string());
        apply_theme(&theme);

        let link = ctx.link().clone();
        let window = web_sys::window().expect("no global `window` exists");
        let listener = EventListener::new(&window, "paste", move |event| {
            if let Some(clipboard_event) = event.dyn_ref::<ClipboardEvent>() {
                link.send_message(Msg::HandlePaste(clipboard_event.clone()));
            }
        });

        let link = ctx.link().clone();
        spawn_local(async move {
            link.send_message(Msg::HealthLoaded(api::health().await.ok()));
            link.send_message(Msg::ModelInfoLoaded(api::model_info().await.ok()));
        });

        Self {
            files: HashMap::new(),
            selected_file_id: None,
            results: HashMap::new(),
            loading: false,
            error: None,
            is_dragging: false,
            paste_listener: Some(listener),
            theme,
            health: None,
            model_info: None,
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            Msg::FilesAdded(files) => self.handle_files_added(ctx, files),
            Msg::AddPreview(id, url) => self.handle_add_preview(id, url),
            Msg::RemoveFile(id) => self.handle_remove_file(id),
            Msg::SelectFile(id) => self.handle_select_file(id),
            Msg::ClearAllFiles => self.handle_clear_all_files(),

            Msg::AnalyzeSelected => self.handle_analyze_selected(ctx),
            Msg::AnalyzeAll => self.handle_analyze_all(ctx),
            Msg::SingleResult(file_id, outcome) => self.handle_single_result(file_id, outcome),
            Msg::BatchResult(file_ids, outcome) => self.handle_batch_result(file_ids, outcome),

            Msg::HealthLoaded(health) => {
                self.health = health;
                true
            }
            Msg::ModelInfoLoaded(info) => {
                self.model_info = info;
                true
            }

            Msg::SetError(error) => {
                self.error = error;
                self.loading = false;
                true
            }
            Msg::SetDragging(is_dragging) => {
                self.is_dragging = is_dragging;
                true
            }
            Msg::ToggleTheme => self.handle_toggle_theme(),

            Msg::HandleDrop(event) => self.handle_drop(ctx, event),
            Msg::HandlePaste(event) => self.handle_paste(ctx, event),
        }
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        html! {
            <div class="container">
                { self.render_header() }
                { self.render_theme_toggle(ctx) }

                <main class="main-content">
                    { self.render_status_panel() }
                    { self.render_upload_section(ctx) }
                    { self.render_error_message() }
                    { self.render_results() }
                </main>

                <footer class="app-footer">
                    <p>{"Cat vs Dog Classifier | Fullstack Rust WASM"}</p>
                </footer>
            </div>
        }
    }
}

// Handler methods
impl App {
    fn handle_files_added(&mut self, ctx: &Context<Self>, files: Vec<GlooFile>) -> bool {
        let available_slots = MAX_FILES.saturating_sub(self.files.len());

        if files.len() > available_slots {
            self.error = Some(format!(
                "Upload limit exceeded. You can only add {} more images.",
                available_slots
            ));
            return true;
        }

        self.error = None;
        let mut new_selection = None;

        for file in files.into_iter() {
            let id = generate_id();
            self.files.insert(
                id,
                FileData {
                    id,
                    file: file.clone(),
                    preview_url: None,
                },
            );

            let preview_url = ObjectUrl::from(file);
            ctx.link().send_message(Msg::AddPreview(id, preview_url));
            new_selection = Some(id);
        }

        if let Some(id) = new_selection {
            self.selected_file_id = Some(id);
        }

        true
    }

    fn handle_add_preview(&mut self, id: u64, url: ObjectUrl) -> bool {
        if let Some(file_data) = self.files.get_mut(&id) {
            file_data.preview_url = Some(url);
            true
        } else {
            false
        }
    }

    fn handle_remove_file(&mut self, id: u64) -> bool {
        if self.files.remove(&id).is_some() {
            self.results.remove(&id);

            if self.selected_file_id == Some(id) {
                self.selected_file_id = self.files.keys().max().copied();
            }
            if self.files.is_empty() {
                self.error = None;
            }
            true
        } else {
            false
        }
    }

    fn handle_select_file(&mut self, id: u64) -> bool {
        if self.selected_file_id != Some(id) && self.files.contains_key(&id) {
            self.selected_file_id = Some(id);
            self.error = None;
            true
        } else {
            false
        }
    }

    fn handle_clear_all_files(&mut self) -> bool {
        self.files.clear();
        self.selected_file_id = None;
        self.results.clear();
        self.error = None;
        true
    }

    fn handle_analyze_selected(&mut self, ctx: &Context<Self>) -> bool {
        if let Some(file_id) = self.selected_file_id {
            if let Some(file_data) = self.files.get(&file_id) {
                self.loading = true;
                self.error = None;

                let file = file_data.file.clone();
                let link = ctx.link().clone();
                spawn_local(async move {
                    let outcome = api::predict(&file).await;
                    link.send_message(Msg::SingleResult(file_id, outcome));
                });
                return true;
            }
        }

        ctx.link()
            .send_message(Msg::SetError(Some("No file selected for analysis.".into())));
        false
    }

    /// One `POST /predict/batch` request for the whole gallery. The response
    /// entries come back in upload order, so the sorted id list is enough to
    /// match them to files.
    fn handle_analyze_all(&mut self, ctx: &Context<Self>) -> bool {
        if self.files.is_empty() {
            return false;
        }

        self.loading = true;
        self.error = None;

        let mut sorted: Vec<&FileData> = self.files.values().collect();
        sorted.sort_by_key(|fd| fd.id);
        let file_ids: Vec<u64> = sorted.iter().map(|fd| fd.id).collect();
        let files: Vec<GlooFile> = sorted.iter().map(|fd| fd.file.clone()).collect();

        let link = ctx.link().clone();
        spawn_local(async move {
            let outcome = api::predict_batch(&files).await;
            link.send_message(Msg::BatchResult(file_ids, outcome));
        });

        true
    }

    fn handle_single_result(
        &mut self,
        file_id: u64,
        outcome: Result<PredictResponse, String>,
    ) -> bool {
        self.loading = false;
        match outcome {
            Ok(response) => {
                gloo_console::log!(serde_json::to_string_pretty(&response).unwrap_or_default());
                self.results
                    .insert(file_id, Ok(DisplayResult::from(&response)));
            }
            Err(message) => {
                self.results.insert(file_id, Err(message));
            }
        }
        true
    }

    fn handle_batch_result(
        &mut self,
        file_ids: Vec<u64>,
        outcome: Result<BatchResponse, String>,
    ) -> bool {
        self.loading = false;
        match outcome {
            Ok(response) => {
                for (file_id, item) in file_ids.into_iter().zip(response.results.iter()) {
                    self.results.insert(file_id, display_from_batch_item(item));
                }
            }
            Err(message) => {
                self.error = Some(message);
            }
        }
        true
    }

    fn handle_toggle_theme(&mut self) -> bool {
        self.theme = if self.theme == "light" {
            "dark".to_string()
        } else {
            "light".to_string()
        };
        apply_theme(&self.theme);
        if let Err(e) = LocalStorage::set(THEME_STORAGE_KEY, &self.theme) {
            gloo_console::error!(format!("Failed to persist theme: {e:?}"));
        }
        true
    }

    fn handle_drop(&mut self, ctx: &Context<Self>, event: DragEvent) -> bool {
        event.prevent_default();
        self.is_dragging = false;

        if let Some(data_transfer) = event.data_transfer() {
            if let Some(file_list) = data_transfer.files() {
                self.process_file_list(ctx, file_list);
            }
        }

        true
    }

    fn handle_paste(&mut self, ctx: &Context<Self>, event: ClipboardEvent) -> bool {
        if let Some(data_transfer) = event.clipboard_data() {
            if let Some(file_list) = data_transfer.files() {
                event.prevent_default();
                self.process_file_list(ctx, file_list);
                return true;
            }
        }
        false
    }

    fn process_file_list(&self, ctx: &Context<Self>, file_list: FileList) {
        let mut files_to_process = Vec::new();

        for i in 0..file_list.length() {
            if let Some(file) = file_list.item(i) {
                if file.type_().starts_with("image/") {
                    files_to_process.push(GlooFile::from(file));
                } else {
                    log::warn!("Skipping non-image file: {}", file.name());
                    ctx.link().send_message(Msg::SetError(Some(format!(
                        "Skipped non-image file: {}",
                        file.name()
                    ))));
                }
            }
        }

        if !files_to_process.is_empty() {
            ctx.link().send_message(Msg::FilesAdded(files_to_process));
        }
    }
}

// Rendering methods
impl App {
    fn render_header(&self) -> Html {
        html! {
            <header class="app-header">
                <h1><i class="fa-solid fa-paw"></i> {" Cat vs Dog Classifier"}</h1>
                <p class="subtitle">{"Upload images via button, drag & drop, or paste"}</p>
            </header>
        }
    }

    fn render_theme_toggle(&self, ctx: &Context<Self>) -> Html {
        let link = ctx.link();

        html! {
            <div class="top-right">
                <button
                    id="theme-toggle"
                    class="theme-toggle"
                    onclick={link.callback(|_| Msg::ToggleTheme)}
                    title={ if self.theme == "light" { "Switch to Dark Mode" } else { "Switch to Light Mode" } }
                >
                    { if self.theme == "light" {
                        html! { <i class="fa-solid fa-sun"></i> }
                    } else {
                        html! { <i class="fa-solid fa-moon"></i> }
                    }}
                </button>
            </div>
        }
    }

    fn render_status_panel(&self) -> Html {
        let (status_class, status_text) = match &self.health {
            Some(health) if health.model_loaded => ("status-ok", "API online"),
            Some(_) => ("status-warn", "API degraded"),
            None => ("status-err", "API unreachable"),
        };

        html! {
            <div class="status-panel">
                <span class={classes!("status-dot", status_class)}></span>
                <span>{ status_text }</span>
                {
                    if let Some(info) = &self.model_info {
                        html! {
                            <span class="model-summary">
                                { format!(
                                    " | {} ({} MB, input {}x{})",
                                    info.model_name,
                                    info.model_size_mb,
                                    info.input_shape.0,
                                    info.input_shape.1
                                )}
                            </span>
                        }
                    } else {
                        html! {}
                    }
                }
            </div>
        }
    }

    fn extract_image_files(file_list: &FileList) -> Vec<GlooFile> {
        (0..file_list.length())
            .filter_map(|i| file_list.item(i))
            .filter(|file| file.type_().starts_with("image/"))
            .map(GlooFile::from)
            .collect()
    }

    fn render_upload_section(&self, ctx: &Context<Self>) -> Html {
        let limit_reached = self.files.len() >= MAX_FILES;
        html! {
            <div class="upload-section">
                { self.render_file_input_area(ctx, limit_reached) }
                { self.render_preview_area(ctx) }
            </div>
        }
    }

    fn render_file_input_area(&self, ctx: &Context<Self>, limit_reached: bool) -> Html {
        if limit_reached {
            return html! {
                <p class="limit-reached">
                    { format!("You have reached the maximum of {} images.", MAX_FILES) }
                </p>
            };
        }

        let link = ctx.link();
        let handle_change = link.callback(|e: Event| {
            let input: HtmlInputElement = e.target_unchecked_into();
            let files = input.files();
            let files_to_process = files
                .as_ref()
                .map(Self::extract_image_files)
                .unwrap_or_default();

            input.set_value("");

            if !files_to_process.is_empty() {
                Msg::FilesAdded(files_to_process)
            } else {
                Msg::SetError(Some("No valid image files selected.".into()))
            }
        });

        let handle_drag_over = link.callback(|e: DragEvent| {
            e.prevent_default();
            Msg::SetDragging(true)
        });

        let handle_drag_leave = link.callback(|e: DragEvent| {
            e.prevent_default();
            Msg::SetDragging(false)
        });

        let handle_drop = link.callback(Msg::HandleDrop);
        let trigger_file_input = Callback::from(|_: ()| {
            if let Some(input) = web_sys::window()
                .and_then(|w| w.document())
                .and_then(|d| d.get_element_by_id("file-input"))
            {
                if let Ok(html_input) = input.dyn_into::<web_sys::HtmlElement>() {
                    html_input.click();
                }
            }
        });

        html! {
            <>
                <input
                    type="file"
                    id="file-input"
                    multiple=true
                    accept="image/jpeg,image/png"
                    style="display: none;"
                    onchange={handle_change}
                />

                <button
                    id="upload-button"
                    class="analyze-btn"
                    onclick={debounce(300, {
                        let trigger_file_input = trigger_file_input.clone();
                        move || trigger_file_input.emit(())
                    })}
                >
                    <i class="fa-solid fa-upload"></i> {" Select Images"}
                </button>

                <div
                    id="drop-zone"
                    class={classes!("upload-area", self.is_dragging.then_some("drag-over"))}
                    ondragover={handle_drag_over}
                    ondragleave={handle_drag_leave}
                    ondrop={handle_drop}
                    onclick={debounce(300, move || trigger_file_input.emit(()))}
                >
                    <div class="upload-placeholder">
                        <i class="fa-solid fa-cloud-arrow-up"></i>
                        <p>{"Drag & drop images here, paste, or click"}</p>
                        <p class="file-types">{"Supported formats: JPG, JPEG, PNG"}</p>
                    </div>
                </div>
            </>
        }
    }

    fn render_preview_area(&self, ctx: &Context<Self>) -> Html {
        if self.files.is_empty() {
            return html! {};
        }

        let link = ctx.link();

        html! {
            <div id="preview-container">
                { self.render_selected_image_preview() }
                <h2>{ format!("Previews: {} / {}", self.files.len(), MAX_FILES) }</h2>
                <div id="image-previews">
                    {{
                        let mut sorted_files: Vec<&FileData> = self.files.values().collect();
                        sorted_files.sort_by_key(|fd| fd.id);
                        sorted_files.iter()
                            .map(|file_data| self.render_preview_item(ctx, file_data))
                            .collect::<Html>()
                    }}
                </div>
                <div class="button-container">
                    <button
                        class="analyze-btn"
                        style="background-color: var(--danger-color);"
                        onclick={link.callback(|_| Msg::ClearAllFiles)}
                    >
                        <i class="fa-solid fa-trash"></i>{" Clear All"}
                    </button>
                    <button
                        class="analyze-btn"
                        onclick={link.callback(|_| Msg::AnalyzeSelected)}
                        disabled={self.loading || self.selected_file_id.is_none()}
                    >
                        { self.render_analyze_button_content() }
                    </button>
                    <button
                        class="analyze-btn"
                        style="background-color: var(--primary-color);"
                        onclick={link.callback(|_| Msg::AnalyzeAll)}
                        disabled={self.loading}
                    >
                        <i class="fa-solid fa-magnifying-glass"></i>{" Analyze All"}
                    </button>
                </div>
            </div>
        }
    }

    fn render_selected_image_preview(&self) -> Html {
        match self
            .selected_file_id
            .and_then(|id| self.files.get(&id))
            .and_then(|fd| fd.preview_url.as_ref())
        {
            Some(url) => html! {
                <img id="actual-image-preview"
                    src={url.to_string()}
                    alt="Image Preview"
                    style="max-width:100%; max-height: 400px; object-fit: contain; margin-bottom: 10px;" />
            },
            None => html! {
                <div class="preview-empty">
                    <p>{"Select an image preview below"}</p>
                </div>
            },
        }
    }

    fn render_analyze_button_content(&self) -> Html {
        if self.loading {
            html! { <><i class="fa-solid fa-spinner fa-spin"></i>{" Analyzing..."}</> }
        } else {
            let filename = self
                .selected_file_id
                .and_then(|id| self.files.get(&id))
                .map(|fd| fd.file.name())
                .unwrap_or_else(|| "Selected Image".to_string());

            let display_name = if filename.len() > 20 {
                format!("{}...", &filename[..17])
            } else {
                filename
            };

            html! { <><i class="fa-solid fa-magnifying-glass"></i>{ format!(" Analyze \"{}\"", display_name) }</> }
        }
    }

    fn render_preview_item(&self, ctx: &Context<Self>, file_data: &FileData) -> Html {
        let file_id = file_data.id;
        let link = ctx.link();
        let is_selected = self.selected_file_id == Some(file_id);

        html! {
            <div
                class={classes!("preview-item", is_selected.then_some("selected"))}
                key={file_id.to_string()}
                onclick={link.callback(move |_| Msg::SelectFile(file_id))}
                title={format!("Click to select for analysis: {}", file_data.file.name())}
            >
                {
                    if let Some(url) = &file_data.preview_url {
                        html! { <img src={url.to_string()} alt={file_data.file.name()} /> }
                    } else {
                        html! { <div class="preview-placeholder">{"..."}</div> }
                    }
                }
                <button
                    class="remove-btn"
                    title="Remove this image"
                    onclick={link.callback(move |e: MouseEvent| {
                        e.stop_propagation();
                        Msg::RemoveFile(file_id)
                    })}
                >
                    <i class="fa-solid fa-times"></i>
                </button>
            </div>
        }
    }

    fn render_error_message(&self) -> Html {
        if let Some(error_msg) = &self.error {
            html! {
                <div class="error-message">
                    <i class="fa-solid fa-circle-exclamation"></i>
                    <p>{ error_msg }</p>
                </div>
            }
        } else {
            html! {}
        }
    }

    fn render_results(&self) -> Html {
        let Some(selected_id) = self.selected_file_id else {
            return html! {};
        };

        let analyzed_filename = self
            .files
            .get(&selected_id)
            .map_or_else(|| "Analyzed Image".to_string(), |fd| fd.file.name());

        match self.results.get(&selected_id) {
            Some(Ok(result)) => self.render_result_card(result, &analyzed_filename),
            Some(Err(message)) => html! {
                <div class="results-container item-failed">
                    <h2><i class="fa-solid fa-circle-exclamation"></i>
                        { format!(" Analysis failed ({})", analyzed_filename) }</h2>
                    <p>{ message }</p>
                </div>
            },
            None => html! { <p>{"No analysis result available for the selected image."}</p> },
        }
    }

    fn render_result_card(&self, result: &DisplayResult, analyzed_filename: &str) -> Html {
        let is_dog = result.label == Label::Dog;

        html! {
            <div class={classes!("results-container", if is_dog { "dog-detected" } else { "cat-detected" })}>
                <div class="result-header">
                    <h2 title={format!("Analysis results for: {}", analyzed_filename)}>
                        {
                            if is_dog {
                                html! { <><i class="fa-solid fa-dog"></i>{" Dog"}</> }
                            } else {
                                html! { <><i class="fa-solid fa-cat"></i>{" Cat"}</> }
                            }
                        }
                        <span class="analyzed-filename-display">{format!("({})", analyzed_filename)}</span>
                    </h2>
                    <div class="confidence-meter">
                        <div class="meter-label">{"Confidence:"}</div>
                        <div class="meter">
                            <div class="meter-fill" style={format!("width: {}%", result.confidence)}></div>
                        </div>
                        <div class="meter-value">{format!("{:.1}%", result.confidence)}</div>
                    </div>
                </div>
                <div class="detailed-results">
                    <h3>{"Class Probabilities"}</h3>
                    <div class="result-bars">
                        { for [(Label::Cat, result.cat), (Label::Dog, result.dog)].iter().map(|(label, percentage)| {
                            html! {
                                <div class="result-item">
                                    <div class="result-label">{ label.to_string() }</div>
                                    <div class="result-bar-container">
                                        <div class="result-bar" style={format!("width: {}%", percentage)}></div>
                                    </div>
                                    <div class="result-value">{ format!("{:.1}%", percentage) }</div>
                                </div>
                            }
                        })}
                    </div>
                </div>
            </div>
        }
    }
}

fn apply_theme(theme: &str) {
    if let Some(body) = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.body())
    {
        let class_list = body.class_list();
        let result = if theme == "dark" {
            class_list.add_1("dark-mode")
        } else {
            class_list.remove_1("dark-mode")
        };
        if let Err(e) = result {
            gloo_console::error!(format!("Failed to apply theme class: {e:?}"));
        }
    }
}

fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("App starting...");
    yew::Renderer::<App>::new().render();
}
