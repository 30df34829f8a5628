//! # 高对称点标签格式化
//!
//! 将求解器给出的点名转换为 LaTeX 形式，供绘图使用：
//! - `G` → `$\Gamma$`
//! - 含 `1` 的点名 → `X$_{1}$`
//! - 超过两个字符 → 第二个字符作下标
//!
//! 包含 `K` 的标签（如未匹配拐点 `Kpt3`）先统一为 `K`。
//!
//! ## 依赖关系
//! - 被 `bands/extractor.rs`, `bands/plot.rs` 使用

/// 点名转 LaTeX
pub fn tex_label(kpt: &str) -> String {
    if kpt == "G" {
        r"$\Gamma$".to_string()
    } else if kpt.contains('1') {
        let base = kpt.split('1').next().unwrap_or_default();
        format!("{}$_{{1}}$", base)
    } else if kpt.chars().count() > 2 {
        let mut chars = kpt.chars();
        let first = chars.next().unwrap_or_default();
        let second = chars.next().unwrap_or_default();
        format!("{}$_{}$", first, second)
    } else {
        kpt.to_string()
    }
}

/// 含 `K` 的标签统一为 `K`
pub fn collapse_k(label: &str) -> &str {
    if label.contains('K') {
        "K"
    } else {
        label
    }
}

/// 轴标签：先合并 `K`，再转 LaTeX
pub fn axis_labels(labels: &[String]) -> Vec<String> {
    labels.iter().map(|l| tex_label(collapse_k(l))).collect()
}

/// LaTeX 标签转为终端/图像可显示的 Unicode
pub fn plain_label(tex: &str) -> String {
    let text = tex.replace(r"$\Gamma$", "Γ");
    let mut out = String::new();
    let mut rest = text.as_str();

    while let Some(start) = rest.find("$_") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let (sub, tail) = match after.find('$') {
            Some(end) => (&after[..end], &after[end + 1..]),
            None => (after, ""),
        };
        let sub = sub.trim_start_matches('{').trim_end_matches('}');
        out.extend(sub.chars().map(subscript));
        rest = tail;
    }
    out.push_str(rest);
    out
}

fn subscript(c: char) -> char {
    match c {
        '0' => '₀',
        '1' => '₁',
        '2' => '₂',
        '3' => '₃',
        '4' => '₄',
        '5' => '₅',
        '6' => '₆',
        '7' => '₇',
        '8' => '₈',
        '9' => '₉',
        'a' => 'ₐ',
        'e' => 'ₑ',
        'o' => 'ₒ',
        'x' => 'ₓ',
        other => other,
    }
}
