//! Internationalization (i18n) module for agent messages.

/// UI messages structure
#[derive(Debug, Clone)]
pub struct Messages {
    pub screen_header: &'static str,
    pub clickable: &'static str,
    pub input: &'static str,
    pub empty: &'static str,
    pub scrollable: &'static str,
    pub text: &'static str,
    pub starting_task: &'static str,
    pub task_completed: &'static str,
    pub task_failed: &'static str,
    pub task_paused: &'static str,
    pub steps: &'static str,
    pub success_rate: &'static str,
    pub duration: &'static str,
    pub enter_goal: &'static str,
    pub no_saved_task: &'static str,
    pub resuming_task: &'static str,
    pub task_cleared: &'static str,
    pub connection_failed: &'static str,
}

/// English messages
pub static MESSAGES_EN: Messages = Messages {
    screen_header: "Screen contents:",
    clickable: "Clickable button",
    input: "Input field",
    empty: "empty",
    scrollable: "Scrollable list",
    text: "Text",
    starting_task: "Starting task",
    task_completed: "Task completed",
    task_failed: "Task failed",
    task_paused: "Task paused",
    steps: "Steps",
    success_rate: "Success rate",
    duration: "Duration",
    enter_goal: "Enter a goal (empty line to quit)",
    no_saved_task: "No saved task to resume",
    resuming_task: "Resuming task",
    task_cleared: "Saved task cleared",
    connection_failed: "Device connection failed",
};

/// Arabic messages
pub static MESSAGES_AR: Messages = Messages {
    screen_header: "محتوى الشاشة:",
    clickable: "زر قابل للنقر",
    input: "حقل إدخال",
    empty: "فارغ",
    scrollable: "قائمة قابلة للتمرير",
    text: "نص",
    starting_task: "بدء المهمة",
    task_completed: "اكتملت المهمة",
    task_failed: "فشلت المهمة",
    task_paused: "تم إيقاف المهمة مؤقتًا",
    steps: "الخطوات",
    success_rate: "معدل النجاح",
    duration: "المدة",
    enter_goal: "أدخل هدفًا (سطر فارغ للخروج)",
    no_saved_task: "لا توجد مهمة محفوظة للاستئناف",
    resuming_task: "استئناف المهمة",
    task_cleared: "تم مسح المهمة المحفوظة",
    connection_failed: "فشل الاتصال بالجهاز",
};

/// Get UI messages by language.
///
/// # Arguments
/// * `lang` - Language code, "ar" for Arabic, anything else for English.
pub fn get_messages(lang: &str) -> &'static Messages {
    match lang {
        "ar" => &MESSAGES_AR,
        _ => &MESSAGES_EN,
    }
}
