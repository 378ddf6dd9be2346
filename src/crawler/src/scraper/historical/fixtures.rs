//! Race result pages shaped like db.netkeiba.com, for tests.

pub const TURF_CONDITIONS: &str =
    "芝右 外2500m\u{a0}/\u{a0}天候 : 晴\u{a0}/\u{a0}芝 : 良\u{a0}/\u{a0}発走 : 15:40";

pub const MIXED_CONDITIONS: &str =
    "障芝ダート3570m\u{a0}/\u{a0}天候 : 曇\u{a0}/\u{a0}芝 : 稍重\u{a0}\u{a0}ダート : 重\u{a0}/\u{a0}発走 : 14:25";

#[allow(clippy::too_many_arguments)]
fn row(
    rank: &str,
    bracket: &str,
    number: &str,
    horse_id: &str,
    name: &str,
    sex_age: &str,
    carried: &str,
    jockey: &str,
    time: &str,
    last_3f: &str,
    odds: &str,
    popularity: &str,
    weight: &str,
    trainer: &str,
    prize: &str,
) -> String {
    format!(
        r#"<tr>
<td class="txt_r">{rank}</td>
<td class="txt_c"><span>{bracket}</span></td>
<td class="txt_r">{number}</td>
<td class="txt_l"><a href="/horse/{horse_id}/" title="{name}">{name}</a></td>
<td class="txt_c">{sex_age}</td>
<td class="txt_c">{carried}</td>
<td class="txt_l"><a href="/jockey/result/recent/01167/">{jockey}</a></td>
<td class="txt_r">{time}</td>
<td class="txt_l"></td>
<td class="txt_c">**</td>
<td class="txt_c">5-5-3-2</td>
<td class="txt_c"><span>{last_3f}</span></td>
<td class="txt_r">{odds}</td>
<td class="txt_c"><span>{popularity}</span></td>
<td class="txt_l">{weight}</td>
<td class="txt_c">**</td>
<td class="txt_c"></td>
<td class="txt_c"></td>
<td class="txt_l">[<span>西</span>]
<a href="/trainer/result/recent/01061/">{trainer}</a></td>
<td class="txt_l"><a href="/owner/result/recent/1/">オーナー</a></td>
<td class="txt_r">{prize}</td>
</tr>"#
    )
}

pub fn result_rows() -> String {
    [
        row(
            "1", "2", "3", "2019105219", "ドウデュース", "牡5", "58", "武豊", "2:31.8",
            "33.1", "2.1", "1", "504(+2)", "友道康夫", "50,000.0",
        ),
        row(
            "2", "4", "7", "2019106147", "スターズオンアース", "牝5", "56", "ルメール",
            "2:31.9", "33.4", "5.3", "2", "470(-4)", "高柳瑞樹", "20,000.0",
        ),
        row(
            "3", "1", "1", "2020103656", "ジャスティンパレス", "牡5", "58", "デムーロ",
            "2:32.0", "33.6", "12.5", "4", "計不", "杉山晴紀", "12,000.0",
        ),
        row(
            "中止", "8", "16", "2020102834", "タイトルホルダー", "牡6", "58", "横山和生",
            "", "", "30.2", "9", "482(0)", "栗田徹", "",
        ),
    ]
    .concat()
}

pub const PAYOUT_TABLES: &str = r#"
<dl class="pay_block">
<dt>払い戻し</dt>
<dd>
<table class="pay_table_01" summary="払い戻し">
<tr><th class="tan">単勝</th><td>3</td><td class="txt_r">210</td><td class="txt_r">1</td></tr>
<tr><th class="fuku">複勝</th><td>3<br />7<br />1</td><td class="txt_r">110<br />160<br />290</td><td class="txt_r">1<br />2<br />4</td></tr>
<tr><th class="uren">馬連</th><td>3 - 7</td><td class="txt_r">1,230</td><td class="txt_r">2</td></tr>
</table>
<table class="pay_table_01" summary="払い戻し">
<tr><th class="wide">ワイド</th><td>3 - 7<br />1 - 3<br />1 - 7</td><td class="txt_r">450<br />700<br />1,020</td><td class="txt_r">2<br />5<br />11</td></tr>
<tr><th class="utan">馬単</th><td>3 → 7</td><td class="txt_r">2,010</td><td class="txt_r">3</td></tr>
<tr><th class="sanfuku">三連複</th><td>1 - 3 - 7</td><td class="txt_r">4,560</td><td class="txt_r">8</td></tr>
<tr><th class="santan">三連単</th><td>3 → 7 → 1</td><td class="txt_r">12,340</td><td class="txt_r">25</td></tr>
</table>
</dd>
</dl>
"#;

/// A complete result page with the given conditions line and rows
pub fn race_page_with(conditions: &str, rows: &str, payouts: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="ja">
<head><meta charset="EUC-JP"><title>有馬記念</title></head>
<body>
<div id="main">
<div class="data_intro">
<dl class="racedata fc">
<dt>11 R</dt>
<dd>
<h1>有馬記念(G1)</h1>
<p><diary_snap_cut><span>{conditions}</span></diary_snap_cut></p>
</dd>
</dl>
<p class="smalltxt">2024年12月22日 5回中山8日目 3歳以上オープン  (国際)(指)(定量)</p>
</div>
<table class="race_table_01 nk_tb_common" summary="レース結果">
<tr class="txt_c">
<th>着順</th><th>枠番</th><th>馬番</th><th>馬名</th><th>性齢</th><th>斤量</th>
<th>騎手</th><th>タイム</th><th>着差</th><th>タイム指数</th><th>通過</th><th>上り</th>
<th>単勝</th><th>人気</th><th>馬体重</th><th>調教タイム</th><th>厩舎コメント</th>
<th>備考</th><th>調教師</th><th>馬主</th><th>賞金(万円)</th>
</tr>
{rows}
</table>
{payouts}
</div>
</body>
</html>"#
    )
}

/// The standard turf fixture
pub fn race_page() -> String {
    race_page_with(TURF_CONDITIONS, &result_rows(), PAYOUT_TABLES)
}

/// The standard turf fixture, dated in `year`
pub fn race_page_in(year: u16) -> String {
    race_page().replace("2024年12月22日", &format!("{}年12月22日", year))
}

/// A page for a race that never ran
pub const MISSING_PAGE: &str = r#"<!DOCTYPE html>
<html><body><div id="main"><p>該当するレースが見つかりませんでした</p></div></body></html>"#;
