//! Display-label lookup for detected objects.
//!
//! Maps the labeling service's lowercase canonical names to display
//! strings: a formatted English name and a Simplified Chinese name from a
//! fixed in-process table. Vendor-specific label synonyms (several
//! person-related labels, generic electronics labels) fold to one
//! canonical dictionary entry before lookup. Unknown labels fall back to
//! the input unchanged.

/// Format a canonical service label for display: underscores become
/// spaces and every word is title-cased.
pub fn format_english(label: &str) -> String {
    label
        .replace('_', " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Fold vendor-specific label synonyms into the canonical dictionary term.
///
/// The labeling service reports people as any of a dozen scene labels;
/// they all translate as one entry. Expects a lowercased label.
fn fold_alias(term: &str) -> &str {
    match term {
        "adult" | "man" | "male" | "human" | "selfie" | "portrait" | "photography" => "person",
        "female" | "woman" => "female",
        "machine" | "electronics" | "device" => "laptop",
        other => other,
    }
}

/// Look up the Chinese display name for a formatted English label.
///
/// Tries the label itself first, then its alias-folded form. Falls back
/// to returning the input unchanged when no mapping exists.
pub fn lookup_chinese(english: &str) -> String {
    let lowered = english.to_lowercase();
    if let Some(cn) = chinese_entry(&lowered) {
        return cn.to_string();
    }

    match chinese_entry(fold_alias(&lowered)) {
        Some(cn) => cn.to_string(),
        None => english.to_string(),
    }
}

/// Fixed fallback dictionary of object names.
fn chinese_entry(term: &str) -> Option<&'static str> {
    let cn = match term {
        "person" => "人",
        "bicycle" => "自行车",
        "car" => "汽车",
        "motorcycle" => "摩托车",
        "bus" => "公共汽车",
        "train" => "火车",
        "truck" => "卡车",
        "boat" => "船",
        "traffic light" => "红绿灯",
        "fire hydrant" => "消防栓",
        "stop sign" => "停止标志",
        "parking meter" => "停车计时器",
        "bench" => "长凳",
        "bird" => "鸟",
        "cat" => "猫",
        "dog" => "狗",
        "horse" => "马",
        "sheep" => "羊",
        "cow" => "牛",
        "elephant" => "大象",
        "bear" => "熊",
        "zebra" => "斑马",
        "giraffe" => "长颈鹿",
        "backpack" => "背包",
        "umbrella" => "雨伞",
        "handbag" => "手提包",
        "tie" => "领带",
        "suitcase" => "手提箱",
        "frisbee" => "飞盘",
        "skis" => "滑雪板",
        "snowboard" => "滑雪板",
        "sports ball" => "运动球",
        "kite" => "风筝",
        "baseball bat" => "棒球棒",
        "baseball glove" => "棒球手套",
        "skateboard" => "滑板",
        "surfboard" => "冲浪板",
        "tennis racket" => "网球拍",
        "bottle" => "水瓶",
        "wine glass" => "酒杯",
        "cup" => "杯子",
        "fork" => "叉子",
        "knife" => "刀",
        "spoon" => "勺子",
        "bowl" => "碗",
        "banana" => "香蕉",
        "apple" => "苹果",
        "sandwich" => "三明治",
        "orange" => "橙子",
        "broccoli" => "西兰花",
        "carrot" => "胡萝卜",
        "hot dog" => "热狗",
        "pizza" => "披萨",
        "donut" => "甜甜圈",
        "cake" => "蛋糕",
        "chair" => "椅子",
        "couch" => "沙发",
        "potted plant" => "盆栽",
        "bed" => "床",
        "dining table" => "餐桌",
        "toilet" => "马桶",
        "tv" => "电视",
        "laptop" => "笔记本电脑",
        "mouse" => "鼠标",
        "remote" => "遥控器",
        "keyboard" => "键盘",
        "cell phone" => "手机",
        "microwave" => "微波炉",
        "oven" => "烤箱",
        "toaster" => "烤面包机",
        "sink" => "水槽",
        "refrigerator" => "冰箱",
        "book" => "书",
        "clock" => "钟",
        "vase" => "花瓶",
        "scissors" => "剪刀",
        "teddy bear" => "玩具熊",
        "hair drier" => "吹风机",
        "toothbrush" => "牙刷",
        "face" => "脸",
        "teeth" => "牙齿",
        "wallet" => "钱包",
        "female" => "女人",
        "smile" => "微笑",
        "head" => "头",
        "table" => "桌子",
        _ => return None,
    };
    Some(cn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_english_names() {
        assert_eq!(format_english("dog"), "Dog");
        assert_eq!(format_english("cell_phone"), "Cell Phone");
        assert_eq!(format_english("traffic light"), "Traffic Light");
    }

    #[test]
    fn direct_dictionary_hit() {
        assert_eq!(lookup_chinese("Dog"), "狗");
        assert_eq!(lookup_chinese("Laptop"), "笔记本电脑");
    }

    #[test]
    fn vendor_aliases_fold_to_canonical_terms() {
        assert_eq!(lookup_chinese("Adult"), "人");
        assert_eq!(lookup_chinese("adult"), "人");
        assert_eq!(lookup_chinese("Man"), "人");
        assert_eq!(lookup_chinese("Selfie"), "人");
        assert_eq!(lookup_chinese("Woman"), "女人");
        assert_eq!(lookup_chinese("Electronics"), "笔记本电脑");
    }

    #[test]
    fn unknown_labels_pass_through() {
        assert_eq!(lookup_chinese("Quasar"), "Quasar");
    }
}
