use serde_json::{Map, Value};

use crate::{
    core::reconciler::{total_amount, totals_by_category},
    types::{BudgetAnalysisRequest, ExpenseCategory, TripRequest},
};

/// Number of most recent expenses listed in the budget analysis prompt
pub const RECENT_EXPENSE_LIMIT: usize = 20;

pub const ITINERARY_SYSTEM_PROMPT: &str =
    "你是一个专业的旅行规划师，擅长为用户制定详细、实用的旅行计划。请用中文回答。";

pub const EXPENSE_PARSER_SYSTEM_PROMPT: &str = "你是一个智能开销记录助手。用户会说一句话描述他们的消费，你需要准确解析出以下信息：
1. category: 类别（必须从以下选择：交通/住宿/餐饮/景点/购物/其他）
2. amount: 金额（数字，必须）
3. description: 描述（简短文本，可选）
4. location: 地点（如果用户提到了地点，可选）
5. payment_method: 支付方式（如果提到：现金/微信/支付宝/银行卡，可选）
6. confidence: 你对解析结果的置信度（0-1之间的小数）

请严格按照 JSON 格式返回，不要添加任何其他文字。";

pub const BUDGET_ANALYST_SYSTEM_PROMPT: &str = "你是一位专业的旅行预算分析师。请基于用户的行程预算和实际开销，提供全面、客观的分析报告。
你的分析应该：
1. 准确识别超支类别和金额
2. 提供具体可行的节省建议
3. 基于实际消费模式优化预算分配
4. 根据消费趋势预测后续开销

请以 JSON 格式返回结果，不要添加其他文字。";

pub const INSIGHTS_SYSTEM_PROMPT: &str = "你是一个旅行专家，了解各地的文化和旅行信息。";

/// Worked examples anchoring the expense parser's output format, one per common category.
const EXPENSE_EXAMPLES: [(&str, &str); 5] = [
    (
        "刚打车去西湖花了30块",
        r#"{"category": "交通", "amount": 30, "description": "打车去西湖", "location": "西湖", "confidence": 0.95}"#,
    ),
    (
        "中午在楼外楼吃饭80元用微信付的",
        r#"{"category": "餐饮", "amount": 80, "description": "楼外楼吃饭", "location": "楼外楼", "payment_method": "微信", "confidence": 0.98}"#,
    ),
    (
        "买了雷峰塔门票40",
        r#"{"category": "景点", "amount": 40, "description": "雷峰塔门票", "location": "雷峰塔", "confidence": 0.9}"#,
    ),
    (
        "住宿500",
        r#"{"category": "住宿", "amount": 500, "description": "住宿", "confidence": 0.85}"#,
    ),
    (
        "花了200买特产",
        r#"{"category": "购物", "amount": 200, "description": "买特产", "confidence": 0.9}"#,
    ),
];

/// Generate the itinerary request prompt, including the output schema template
pub fn itinerary_prompt(request: &TripRequest, days: i64) -> String {
    let destination = request.destination.trim();
    format!(
        r#"请为我生成一份详细的旅行计划，要求如下：

旅行信息：
- 目的地：{destination}
- 出行时间：{start} 至 {end}（共 {days} 天）
- 预算：{budget} 元人民币
- 同行人数：{people} 人
- 特别偏好：{preferences}

请生成详细的旅行计划，必须严格按照以下 JSON 格式返回：

{{
  "summary": "简要总结这次旅行的亮点（50-100字）",
  "budget_breakdown": {{
    "transportation": 800,
    "accommodation": 1200,
    "food": 1500,
    "attractions": 800,
    "shopping": 500,
    "other": 200
  }},
  "daily_itinerary": [
    {{
      "day": 1,
      "date": "{start}",
      "theme": "第一天的主题（如：历史文化探索）",
      "items": [
        {{
          "time": "09:00",
          "type": "attraction",
          "title": "具体地点或活动名称",
          "description": "详细描述（50-100字）",
          "location": "具体地址",
          "estimated_cost": 100,
          "duration": "2小时",
          "tips": "实用建议或注意事项"
        }}
      ]
    }}
  ],
  "accommodation_suggestions": [
    {{
      "name": "酒店名称",
      "location": "具体地址",
      "price_range": "价格范围（如：300-500元/晚）",
      "features": "特色（如：近地铁、含早餐）",
      "booking_tips": "预订建议"
    }}
  ],
  "travel_tips": [
    "实用建议1（如：建议购买交通卡）",
    "实用建议2（如：注意当地天气）",
    "实用建议3（如：提前预订热门景点门票）"
  ],
  "emergency_contacts": [
    {{
      "name": "紧急联系名称（如：当地警察）",
      "phone": "电话号码"
    }}
  ]
}}

要求：
1. 必须返回有效的 JSON 格式，不要包含任何其他说明文字
2. 数字类型的字段（如 estimated_cost, day, transportation 等）必须使用数字，不要使用字符串
3. type 字段的值只能是：attraction, restaurant, hotel, transportation 之一
4. 每天至少安排 4-6 个行程项目，时间安排要合理
5. 预算分配要符合实际，不能超出总预算
6. 考虑交通时间，相邻景点之间的路程要合理
7. 提供具体的地址，方便导航
8. 针对{destination}的特色，推荐当地美食和必去景点"#,
        destination = destination,
        start = request.start_date.trim(),
        end = request.end_date.trim(),
        days = days,
        budget = request.budget,
        people = request.people_count,
        preferences = request.preferences_or_default(),
    )
}

/// Generate the few-shot expense parsing prompt for one utterance
pub fn expense_parsing_prompt(voice_text: &str) -> String {
    let examples: Vec<String> = EXPENSE_EXAMPLES
        .iter()
        .enumerate()
        .map(|(idx, (input, output))| {
            format!("示例{}:\n输入：\"{}\"\n输出：{}", idx + 1, input, output)
        })
        .collect();

    format!(
        "用户输入的语音文本：\"{}\"\n\n请解析这句话，提取出开销信息。参考以下示例：\n\n{}\n\n请按照相同的格式解析用户输入。注意：\n- category 必须是：交通、住宿、餐饮、景点、购物、其他 之一\n- amount 必须是数字\n- 如果无法确定某个字段，可以省略（除了 category 和 amount 必须有）\n- confidence 表示你对解析的置信度（0-1）\n\n现在请解析用户输入并返回 JSON：",
        voice_text.trim(),
        examples.join("\n\n")
    )
}

/// Generate the budget analysis prompt from actual spend and the plan
pub fn budget_analysis_prompt(request: &BudgetAnalysisRequest) -> String {
    let mut planned = Map::new();
    for category in ExpenseCategory::ALL {
        planned.insert(
            category.label().to_string(),
            Value::from(request.budget_breakdown.get(category)),
        );
    }

    let planned_json = serde_json::to_string_pretty(&planned).unwrap_or_default();
    let actual_json =
        serde_json::to_string_pretty(&totals_by_category(&request.expenses)).unwrap_or_default();

    let recent: Vec<String> = request
        .expenses
        .iter()
        .take(RECENT_EXPENSE_LIMIT)
        .map(|expense| {
            format!(
                "- {}: ¥{} ({})",
                expense.category,
                expense.amount,
                expense.description.as_deref().unwrap_or("无描述")
            )
        })
        .collect();

    format!(
        r#"请分析以下行程的预算情况：

## 行程信息
- 目的地：{destination}
- 总预算：¥{total_budget}
- 剩余天数：{remaining_days} 天

## 预算分配
{planned_json}

## 实际开销（共 {count} 笔，总计 ¥{total_spent}）
### 按类别汇总：
{actual_json}

### 最近开销明细：
{recent}

## 请提供以下分析（JSON 格式）：

{{
  "overspending_alert": {{
    "has_overspending": true/false,
    "categories": [
      {{
        "category": "类别名",
        "budget": 预算金额,
        "actual": 实际花费,
        "overspent": 超支金额,
        "percentage": 超支百分比
      }}
    ],
    "message": "简短的超支警告信息"
  }},
  "saving_suggestions": [
    {{
      "suggestion": "具体的节省建议",
      "category": "相关类别",
      "estimated_saving": 预计节省金额
    }}
  ],
  "optimized_budget": {{
    "交通": 调整后金额,
    "住宿": 调整后金额,
    "餐饮": 调整后金额,
    "景点": 调整后金额,
    "购物": 调整后金额,
    "其他": 调整后金额,
    "rationale": "为什么这样调整的简短说明"
  }},
  "trend_prediction": {{
    "predicted_total": 预测总花费,
    "predicted_overspending": 预测超支金额,
    "warning_level": "low/medium/high",
    "message": "趋势分析和建议"
  }}
}}

请基于实际数据提供专业、客观的分析。"#,
        destination = request.destination,
        total_budget = request.total_budget,
        remaining_days = request.remaining_days,
        planned_json = planned_json,
        count = request.expenses.len(),
        total_spent = total_amount(&request.expenses),
        actual_json = actual_json,
        recent = recent.join("\n"),
    )
}

/// Generate the destination overview prompt
pub fn destination_insights_prompt(destination: &str) -> String {
    format!(
        "请提供关于{}的旅行见解，包括：\n1. 最佳旅行季节\n2. 必去景点TOP5\n3. 当地美食推荐\n4. 文化习俗和注意事项\n5. 交通建议\n\n请以JSON格式返回。",
        destination.trim()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BudgetBreakdown, ExpenseRecord};

    fn request() -> TripRequest {
        TripRequest {
            destination: "杭州".to_string(),
            start_date: "2025-05-01".to_string(),
            end_date: "2025-05-03".to_string(),
            budget: 5000.0,
            people_count: 2,
            preferences: Some("喜欢美食".to_string()),
        }
    }

    #[test]
    fn test_itinerary_prompt_embeds_trip() {
        let prompt = itinerary_prompt(&request(), 3);

        assert!(prompt.contains("目的地：杭州"));
        assert!(prompt.contains("2025-05-01 至 2025-05-03（共 3 天）"));
        assert!(prompt.contains("预算：5000 元人民币"));
        assert!(prompt.contains("同行人数：2 人"));
        assert!(prompt.contains("特别偏好：喜欢美食"));
        assert!(prompt.contains("\"date\": \"2025-05-01\""));
        assert!(prompt.contains("attraction, restaurant, hotel, transportation"));
        assert!(prompt.contains("4-6 个行程项目"));
    }

    #[test]
    fn test_itinerary_prompt_default_preferences() {
        let mut req = request();
        req.preferences = Some("   ".to_string());
        assert!(itinerary_prompt(&req, 3).contains("特别偏好：无特别要求"));
    }

    #[test]
    fn test_expense_prompt_has_five_examples() {
        let prompt = expense_parsing_prompt("住宿500");

        assert!(prompt.starts_with("用户输入的语音文本：\"住宿500\""));
        for idx in 1..=5 {
            assert!(prompt.contains(&format!("示例{}:", idx)));
        }
        assert!(!prompt.contains("示例6"));
        assert!(prompt.contains("交通、住宿、餐饮、景点、购物、其他"));
        assert!(prompt.ends_with("返回 JSON："));
    }

    #[test]
    fn test_expense_examples_are_valid_json() {
        for (_, output) in EXPENSE_EXAMPLES {
            let value: Value = serde_json::from_str(output).unwrap();
            assert!(value["amount"].is_number());
            assert!(ExpenseCategory::from_label(value["category"].as_str().unwrap()).is_some());
        }
    }

    #[test]
    fn test_budget_prompt_limits_recent_expenses() {
        let expenses: Vec<ExpenseRecord> = (0..25)
            .map(|i| {
                ExpenseRecord::new(ExpenseCategory::Food, 10.0)
                    .with_description(format!("午餐{}", i))
            })
            .collect();
        let request = BudgetAnalysisRequest {
            expenses,
            budget_breakdown: BudgetBreakdown {
                food: 300.0,
                ..Default::default()
            },
            total_budget: 1000.0,
            destination: "成都".to_string(),
            remaining_days: 2,
        };

        let prompt = budget_analysis_prompt(&request);
        assert!(prompt.contains("- 目的地：成都"));
        assert!(prompt.contains("剩余天数：2 天"));
        assert!(prompt.contains("共 25 笔，总计 ¥250"));
        assert!(prompt.contains("\"餐饮\": 300.0"));
        assert!(prompt.contains("- 餐饮: ¥10 (午餐19)"));
        assert!(!prompt.contains("(午餐20)"));
    }

    #[test]
    fn test_budget_prompt_without_descriptions() {
        let request = BudgetAnalysisRequest {
            expenses: vec![ExpenseRecord::new(ExpenseCategory::Transportation, 30.0)],
            ..Default::default()
        };
        assert!(budget_analysis_prompt(&request).contains("- 交通: ¥30 (无描述)"));
    }

    #[test]
    fn test_insights_prompt() {
        let prompt = destination_insights_prompt(" 西安 ");
        assert!(prompt.starts_with("请提供关于西安的旅行见解"));
        assert!(prompt.contains("必去景点TOP5"));
    }
}
