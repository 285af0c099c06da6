//! ショートカット設定の管理。

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// ショートカット設定の全体。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shortcuts {
    pub login: LoginShortcuts,
    pub deliveries: DeliveriesShortcuts,
    pub detail: DetailShortcuts,
    pub wizard: WizardShortcuts,
    pub chat: ChatShortcuts,
    /// 追加前の設定ファイルにも無い場合があるため既定値で補う。
    #[serde(default)]
    pub products: ProductsShortcuts,
    pub input_box: InputBoxShortcuts,
}

/// ログイン画面のショートカット。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginShortcuts {
    pub quit: Vec<String>,
    pub username: Vec<String>,
    pub password: Vec<String>,
    pub submit: Vec<String>,
}

/// 配送一覧画面のショートカット。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveriesShortcuts {
    pub quit: Vec<String>,
    pub refresh: Vec<String>,
    pub open: Vec<String>,
    pub down: Vec<String>,
    pub up: Vec<String>,
    pub new_delivery: Vec<String>,
    pub filter_status: Vec<String>,
    pub filter_city: Vec<String>,
    #[serde(default = "default_products_key")]
    pub products: Vec<String>,
    pub logout: Vec<String>,
}

/// 配送詳細画面のショートカット。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailShortcuts {
    pub back: Vec<String>,
    pub refresh: Vec<String>,
    pub chat: Vec<String>,
    pub next_photo: Vec<String>,
    pub prev_photo: Vec<String>,
    pub delete_photo: Vec<String>,
    pub cycle_status: Vec<String>,
}

/// ウィザード画面のショートカット。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardShortcuts {
    pub cancel: Vec<String>,
    pub next: Vec<String>,
    pub add: Vec<String>,
    pub remove: Vec<String>,
    pub edit: Vec<String>,
    pub down: Vec<String>,
    pub up: Vec<String>,
    pub reload_products: Vec<String>,
    pub dismiss_error: Vec<String>,
}

/// チャット画面のショートカット。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatShortcuts {
    pub back: Vec<String>,
    pub compose: Vec<String>,
    pub load_older: Vec<String>,
    pub dismiss_error: Vec<String>,
}

/// 商品管理画面（スーパーバイザー用）のショートカット。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductsShortcuts {
    pub back: Vec<String>,
    pub refresh: Vec<String>,
    pub add: Vec<String>,
    pub edit: Vec<String>,
    pub delete: Vec<String>,
    pub down: Vec<String>,
    pub up: Vec<String>,
}

impl Default for ProductsShortcuts {
    fn default() -> Self {
        Self {
            back: keys(&["Esc"]),
            refresh: keys(&["r"]),
            add: keys(&["a"]),
            edit: keys(&["e"]),
            delete: keys(&["d"]),
            down: keys(&["Down", "j"]),
            up: keys(&["Up", "k"]),
        }
    }
}

fn default_products_key() -> Vec<String> {
    keys(&["p"])
}

/// InputBoxのショートカット。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputBoxShortcuts {
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
    pub backspace: Vec<String>,
    pub delete: Vec<String>,
    pub left: Vec<String>,
    pub right: Vec<String>,
    pub home: Vec<String>,
    pub end: Vec<String>,
    pub clear_line: Vec<String>,
}

impl Shortcuts {
    /// TOMLから読み込み、無ければデフォルトを返す。
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            // 既存ファイルを読み込んでパースする。
            let content = std::fs::read_to_string(path)?;
            let shortcuts: Shortcuts = toml::from_str(&content)?;
            Ok(shortcuts)
        } else {
            // 未作成の場合は既定値を利用する。
            Ok(Self::default())
        }
    }
}

/// 文字列リストを組み立てる。
fn keys(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for Shortcuts {
    fn default() -> Self {
        Self {
            login: LoginShortcuts {
                quit: keys(&["q"]),
                username: keys(&["u"]),
                password: keys(&["p"]),
                submit: keys(&["Enter"]),
            },
            deliveries: DeliveriesShortcuts {
                quit: keys(&["q"]),
                refresh: keys(&["r"]),
                open: keys(&["Enter"]),
                down: keys(&["Down", "j"]),
                up: keys(&["Up", "k"]),
                new_delivery: keys(&["n"]),
                filter_status: keys(&["f"]),
                filter_city: keys(&["c"]),
                products: default_products_key(),
                logout: keys(&["Ctrl+l"]),
            },
            detail: DetailShortcuts {
                back: keys(&["Esc"]),
                refresh: keys(&["r"]),
                chat: keys(&["c"]),
                next_photo: keys(&["Down", "j"]),
                prev_photo: keys(&["Up", "k"]),
                delete_photo: keys(&["d"]),
                cycle_status: keys(&["s"]),
            },
            wizard: WizardShortcuts {
                cancel: keys(&["Esc"]),
                next: keys(&["Enter"]),
                add: keys(&["a"]),
                remove: keys(&["d"]),
                edit: keys(&["e"]),
                down: keys(&["Down", "j"]),
                up: keys(&["Up", "k"]),
                reload_products: keys(&["r"]),
                dismiss_error: keys(&["x"]),
            },
            chat: ChatShortcuts {
                back: keys(&["Esc"]),
                compose: keys(&["Enter", "i"]),
                load_older: keys(&["PageUp", "o"]),
                dismiss_error: keys(&["x"]),
            },
            products: ProductsShortcuts::default(),
            input_box: InputBoxShortcuts {
                confirm: keys(&["Enter"]),
                cancel: keys(&["Esc"]),
                backspace: keys(&["Backspace"]),
                delete: keys(&["Delete"]),
                left: keys(&["Left"]),
                right: keys(&["Right"]),
                home: keys(&["Home"]),
                end: keys(&["End"]),
                clear_line: keys(&["Ctrl+u"]),
            },
        }
    }
}

/// KeyEventがいずれかのショートカット文字列と一致するか判定する。
pub fn matches_shortcut(key: &KeyEvent, shortcuts: &[String]) -> bool {
    shortcuts.iter().any(|s| matches_single_shortcut(key, s))
}

/// KeyEventが単一のショートカット文字列と一致するか判定する。
fn matches_single_shortcut(key: &KeyEvent, shortcut: &str) -> bool {
    // ショートカット文字列を分解する（例: "Ctrl+u", "a", "Enter"）。
    let parts: Vec<&str> = shortcut.split('+').collect();

    let (modifiers_str, key_str) = if parts.len() > 1 {
        // 修飾キー付きの形式（例: "Ctrl+u"）。
        (&parts[0..parts.len() - 1], parts[parts.len() - 1])
    } else {
        // 修飾キーなしの形式（例: "a", "Enter"）。
        (&[][..], parts[0])
    };

    // 修飾キーを解析して期待値を作る。
    let mut expected_modifiers = KeyModifiers::empty();
    for modifier in modifiers_str {
        match *modifier {
            "Ctrl" | "ctrl" => expected_modifiers |= KeyModifiers::CONTROL,
            "Alt" | "alt" => expected_modifiers |= KeyModifiers::ALT,
            "Shift" | "shift" => expected_modifiers |= KeyModifiers::SHIFT,
            _ => return false,
        }
    }

    // 修飾キーが一致しなければ即座に不一致とする。
    if key.modifiers != expected_modifiers {
        return false;
    }

    // キーコードの種別ごとに一致判定を行う。
    match key_str {
        "Enter" | "enter" => key.code == KeyCode::Enter,
        "Esc" | "esc" => key.code == KeyCode::Esc,
        "Tab" | "tab" => key.code == KeyCode::Tab,
        "Backspace" | "backspace" => key.code == KeyCode::Backspace,
        "Delete" | "delete" => key.code == KeyCode::Delete,
        "Up" | "up" => key.code == KeyCode::Up,
        "Down" | "down" => key.code == KeyCode::Down,
        "Left" | "left" => key.code == KeyCode::Left,
        "Right" | "right" => key.code == KeyCode::Right,
        "Home" | "home" => key.code == KeyCode::Home,
        "End" | "end" => key.code == KeyCode::End,
        "PageUp" | "pageup" => key.code == KeyCode::PageUp,
        "PageDown" | "pagedown" => key.code == KeyCode::PageDown,
        // 単一文字は Char として比較する。
        s if s.len() == 1 => {
            if let Some(c) = s.chars().next() {
                key.code == KeyCode::Char(c)
            } else {
                false
            }
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_shortcut_simple_char() {
        // 単一文字の一致判定を検証する。
        let key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::empty());
        assert!(matches_shortcut(&key, &[String::from("q")]));
        assert!(!matches_shortcut(&key, &[String::from("w")]));
    }

    #[test]
    fn test_matches_shortcut_special_key() {
        // 特殊キーの一致判定を検証する。
        let key = KeyEvent::new(KeyCode::Enter, KeyModifiers::empty());
        assert!(matches_shortcut(&key, &[String::from("Enter")]));
        assert!(!matches_shortcut(&key, &[String::from("Esc")]));
    }

    #[test]
    fn test_matches_shortcut_with_modifier() {
        // 修飾キー付きの一致判定を検証する。
        let key = KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL);
        assert!(matches_shortcut(&key, &[String::from("Ctrl+u")]));
        assert!(!matches_shortcut(&key, &[String::from("u")]));
    }

    #[test]
    fn test_matches_shortcut_arrow_keys() {
        // 矢印キーの一致判定を検証する。
        let key = KeyEvent::new(KeyCode::Up, KeyModifiers::empty());
        assert!(matches_shortcut(&key, &[String::from("Up")]));
        assert!(!matches_shortcut(&key, &[String::from("Down")]));
    }

    #[test]
    fn test_matches_shortcut_multiple_keys() {
        // 複数キーバインドの一致判定を検証する。
        let key_up = KeyEvent::new(KeyCode::Up, KeyModifiers::empty());
        let key_k = KeyEvent::new(KeyCode::Char('k'), KeyModifiers::empty());
        let shortcuts = vec![String::from("Up"), String::from("k")];

        assert!(matches_shortcut(&key_up, &shortcuts));
        assert!(matches_shortcut(&key_k, &shortcuts));

        let key_j = KeyEvent::new(KeyCode::Char('j'), KeyModifiers::empty());
        assert!(!matches_shortcut(&key_j, &shortcuts));
    }

    #[test]
    fn test_default_shortcuts_roundtrip_through_toml() {
        // 既定値をTOMLへ書き出して読み戻せることを検証する。
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shortcut.toml");
        let content = toml::to_string_pretty(&Shortcuts::default()).unwrap();
        std::fs::write(&path, content).unwrap();

        let loaded = Shortcuts::load_or_default(&path).unwrap();
        let key = KeyEvent::new(KeyCode::PageUp, KeyModifiers::empty());
        assert!(matches_shortcut(&key, &loaded.chat.load_older));
        let key = KeyEvent::new(KeyCode::Char('l'), KeyModifiers::CONTROL);
        assert!(matches_shortcut(&key, &loaded.deliveries.logout));
    }

    #[test]
    fn test_older_file_without_products_section_still_loads() {
        // 商品管理のキーが無い旧設定でも既定値で補われる。
        let mut value = toml::Value::try_from(Shortcuts::default()).unwrap();
        let table = value.as_table_mut().unwrap();
        table.remove("products");
        table
            .get_mut("deliveries")
            .and_then(|v| v.as_table_mut())
            .unwrap()
            .remove("products");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shortcut.toml");
        std::fs::write(&path, toml::to_string(&value).unwrap()).unwrap();

        let loaded = Shortcuts::load_or_default(&path).unwrap();
        assert_eq!(loaded.deliveries.products, vec!["p".to_string()]);
        assert_eq!(loaded.products.delete, vec!["d".to_string()]);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        // ファイルが無ければ既定値を返す。
        let dir = tempfile::tempdir().unwrap();
        let loaded = Shortcuts::load_or_default(dir.path().join("none.toml")).unwrap();
        assert_eq!(loaded.wizard.next, vec!["Enter".to_string()]);
    }
}
